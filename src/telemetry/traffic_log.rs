//! JSONL mirror of fabric traffic.
//!
//! One JSON object per line:
//!
//! ```text
//! {"timestamp":"2024-01-01T22:00:00.123+00:00","kind":"RADriver","tracking":"On","direction":"North","position":1234}
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{MountError, Result};
use crate::msg::protocol::Message;

#[derive(Serialize)]
struct TrafficRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    message: &'a Message,
}

/// Append-only traffic log
pub struct TrafficLog {
    writer: BufWriter<File>,
    path: PathBuf,
    records: u64,
}

impl std::fmt::Debug for TrafficLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficLog")
            .field("path", &self.path)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl TrafficLog {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Logging traffic to {}", path.display());

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            records: 0,
        })
    }

    /// Write one record and flush it
    pub fn append(&mut self, message: &Message) -> Result<()> {
        let record = TrafficRecord {
            timestamp: chrono::Local::now().to_rfc3339(),
            message,
        };

        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| MountError::Io(e.into()))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::protocol::{Direction, RaState, Tracking};

    #[test]
    fn test_appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.jsonl");

        let mut log = TrafficLog::open(&path).unwrap();
        log.append(&Message::Foo { name: "ping".into() }).unwrap();
        log.append(&Message::RaDriver(RaState {
            tracking: Tracking::On,
            direction: Direction::North,
            position: 7,
        }))
        .unwrap();
        assert_eq!(log.records(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "Foo");
        assert_eq!(lines[0]["name"], "ping");
        assert_eq!(lines[1]["kind"], "RADriver");
        assert_eq!(lines[1]["position"], 7);
        assert!(chrono::DateTime::parse_from_rfc3339(lines[1]["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.jsonl");

        TrafficLog::open(&path).unwrap().append(&Message::Foo { name: "a".into() }).unwrap();
        TrafficLog::open(&path).unwrap().append(&Message::Foo { name: "b".into() }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrafficLog::open(dir.path().join("nope").join("traffic.jsonl"));
        assert!(matches!(result, Err(MountError::Io(_))));
    }
}
