//! # Frame Decoder
//!
//! Pulls frames out of a serial byte stream and turns them into messages.
//!
//! Scanning rules:
//! 1. Bytes before a `^` are noise (this includes the `\n` trailer).
//! 2. After `^`, bytes accumulate until `~`; the frame is emitted with
//!    both sentinels so it can be relayed verbatim.
//! 3. A silence longer than the frame timeout mid-frame abandons the
//!    partial frame.
//! 4. A `^` mid-frame restarts the frame.

use std::io::ErrorKind;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, trace};

use super::protocol::*;
use crate::error::{MountError, Result};

/// Default mid-frame silence before a partial frame is dropped
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(1000);

/// Longest frame accepted, sentinels included
pub const MAX_FRAME_LEN: usize = 255;

/// Frame scanner over any async byte source
pub struct FrameReader<R> {
    reader: BufReader<R>,
    timeout: Duration,
    buf: BytesMut,
}

impl<R> std::fmt::Debug for FrameReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("timeout", &self.timeout)
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(reader),
            timeout,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Wait for the next complete frame
    ///
    /// # Returns
    ///
    /// * `Ok(Some(frame))` - raw frame bytes from `^` to `~` inclusive
    /// * `Ok(None)` - the stream ended; any partial frame is discarded
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            let next = if self.buf.is_empty() {
                self.read_byte().await?
            } else {
                match tokio::time::timeout(self.timeout, self.read_byte()).await {
                    Ok(next) => next?,
                    Err(_) => {
                        debug!("Frame timed out mid-frame ({} bytes dropped)", self.buf.len());
                        self.buf.clear();
                        continue;
                    }
                }
            };

            let Some(byte) = next else {
                if !self.buf.is_empty() {
                    debug!("Stream closed mid-frame ({} bytes dropped)", self.buf.len());
                    self.buf.clear();
                }
                return Ok(None);
            };

            match byte {
                FRAME_START => {
                    if !self.buf.is_empty() {
                        debug!("Frame restarted ({} bytes dropped)", self.buf.len());
                        self.buf.clear();
                    }
                    self.buf.put_u8(byte);
                }
                _ if self.buf.is_empty() => {
                    trace!("Noise byte 0x{:02X}", byte);
                }
                FRAME_END => {
                    self.buf.put_u8(byte);
                    return Ok(Some(self.buf.split().freeze()));
                }
                _ if self.buf.len() >= MAX_FRAME_LEN - 1 => {
                    debug!("Frame exceeds {} bytes, dropped", MAX_FRAME_LEN);
                    self.buf.clear();
                }
                _ => self.buf.put_u8(byte),
            }
        }
    }

    async fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.reader.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Decode a frame, with or without its sentinels
///
/// # Errors
///
/// Returns `Protocol` for an unknown kind, missing fields or values
/// outside their allowed set.
pub fn decode_frame(frame: &[u8]) -> Result<Message> {
    let body = frame.strip_prefix(&[FRAME_START]).unwrap_or(frame);
    let body = body.strip_suffix(&[FRAME_END]).unwrap_or(body);

    let body = std::str::from_utf8(body)
        .map_err(|e| MountError::Protocol(format!("Frame is not UTF-8: {}", e)))?;

    decode_message(body)
}

/// Decode the `|`-separated body of a frame
pub fn decode_message(body: &str) -> Result<Message> {
    let fields: Vec<&str> = body.split(FIELD_SEPARATOR as char).collect();
    let kind: MessageKind = fields[0].parse()?;

    match kind {
        MessageKind::Foo => Ok(Message::Foo {
            name: fields.get(1).copied().unwrap_or_default().to_string(),
        }),
        MessageKind::Handset => Ok(Message::Handset {
            keys: fields[1..].iter().map(|k| k.to_string()).collect(),
        }),
        MessageKind::RaDriver => {
            if fields.len() < 4 {
                return Err(MountError::Protocol(format!(
                    "RADriver needs 3 fields, got {}",
                    fields.len() - 1
                )));
            }

            let position = fields[3].parse::<u32>().map_err(|e| {
                MountError::Protocol(format!("Invalid position {:?}: {}", fields[3], e))
            })?;

            Ok(Message::RaDriver(RaState {
                tracking: fields[1].parse()?,
                direction: fields[2].parse()?,
                position,
            }))
        }
        MessageKind::RaDriverCmd => {
            let cmd = fields
                .get(1)
                .ok_or_else(|| MountError::Protocol("RADriverCmd without a command".to_string()))?
                .parse()?;

            let args = match fields.get(2) {
                Some(joined) if !joined.is_empty() => {
                    joined.split(ARG_SEPARATOR as char).map(str::to_string).collect()
                }
                _ => Vec::new(),
            };

            Ok(Message::RaDriverCmd { cmd, args })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::encoder::encode_frame;
    use tokio::io::AsyncWriteExt;

    async fn frames_from(bytes: &[u8]) -> Vec<Bytes> {
        let mut reader = FrameReader::new(bytes, DEFAULT_FRAME_TIMEOUT);
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_noise_between_frames_is_ignored() {
        let frames = frames_from(b"garbage^Foo|a~more^Foo|b~").await;
        let messages: Vec<Message> = frames.iter().map(|f| decode_frame(f).unwrap()).collect();

        assert_eq!(
            messages,
            vec![Message::Foo { name: "a".into() }, Message::Foo { name: "b".into() }]
        );
        assert_eq!(&frames[0][..], b"^Foo|a~");
    }

    #[tokio::test]
    async fn test_trailer_newlines_are_noise() {
        let frames = frames_from(b"^Foo|a~\n^Foo|b~\n").await;
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_frame_at_eof_is_dropped() {
        let frames = frames_from(b"^Foo|a~^Foo|b").await;
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn test_start_mid_frame_restarts() {
        let frames = frames_from(b"^Foo|lost^Foo|kept~").await;
        assert_eq!(frames.len(), 1);
        assert_eq!(decode_frame(&frames[0]).unwrap(), Message::Foo { name: "kept".into() });
    }

    #[tokio::test]
    async fn test_oversized_frame_is_dropped() {
        let mut stream = b"^Foo|".to_vec();
        stream.extend(std::iter::repeat(b'x').take(MAX_FRAME_LEN));
        stream.extend_from_slice(b"~^Foo|ok~");

        let frames = frames_from(&stream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"^Foo|ok~");
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_mid_frame_abandons_buffer() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(rx, DEFAULT_FRAME_TIMEOUT);

        let writer = tokio::spawn(async move {
            tx.write_all(b"^Foo|stale").await.unwrap();
            tokio::time::sleep(Duration::from_millis(1500)).await;
            tx.write_all(b"tail~^Foo|fresh~").await.unwrap();
        });

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(decode_frame(&frame).unwrap(), Message::Foo { name: "fresh".into() });

        writer.await.unwrap();
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unterminated_frame_yields_nothing_after_timeout() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(rx, DEFAULT_FRAME_TIMEOUT);
        tx.write_all(b"^Foo|never").await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), reader.next_frame()).await;
        assert!(result.is_err(), "no frame may be produced");
        assert!(reader.buf.is_empty(), "partial frame must be abandoned");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_but_steady_frame_survives() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(rx, DEFAULT_FRAME_TIMEOUT);

        tokio::spawn(async move {
            for byte in b"^Foo|slow~" {
                tx.write_all(&[*byte]).await.unwrap();
                tokio::time::sleep(Duration::from_millis(900)).await;
            }
        });

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"^Foo|slow~");
    }

    #[test]
    fn test_decode_round_trip() {
        let messages = vec![
            Message::Foo { name: "bar".into() },
            Message::Foo { name: String::new() },
            Message::Handset { keys: vec!["7".into(), "ScrollUp".into()] },
            Message::Handset { keys: vec![] },
            Message::RaDriver(RaState {
                tracking: Tracking::Off,
                direction: Direction::North,
                position: u32::MAX,
            }),
            Message::RaDriverCmd {
                cmd: RaCommand::SetDirection,
                args: vec!["South".into()],
            },
            Message::RaDriverCmd {
                cmd: RaCommand::SetTracking,
                args: vec!["On".into(), "x".into()],
            },
            Message::RaDriverCmd {
                cmd: RaCommand::SetTracking,
                args: vec![],
            },
        ];

        for message in messages {
            let frame = encode_frame(&message).unwrap();
            assert_eq!(decode_frame(&frame).unwrap(), message);
        }

        // Would come back as no arguments, so it is never framed
        for args in [vec![String::new()], vec!["On".into(), String::new()]] {
            let message = Message::RaDriverCmd { cmd: RaCommand::SetTracking, args };
            assert!(matches!(encode_frame(&message), Err(MountError::Protocol(_))));
        }
    }

    #[test]
    fn test_decode_foo_without_name() {
        assert_eq!(decode_message("Foo").unwrap(), Message::Foo { name: String::new() });
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        for body in [
            "",
            "Log|Info|x",
            "RADriver|On|North",
            "RADriver|Maybe|North|1",
            "RADriver|On|Up|1",
            "RADriver|On|North|-1",
            "RADriverCmd",
            "RADriverCmd|Slew|1",
        ] {
            let result = decode_message(body);
            assert!(matches!(result, Err(MountError::Protocol(_))), "{:?} decoded", body);
        }
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(decode_frame(b"^Foo|\xFF~").is_err());
    }
}
