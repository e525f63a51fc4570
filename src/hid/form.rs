//! # Handset Edit Buffers
//!
//! Each setup screen edits one bounded string with a fixed target format:
//!
//! | Field | Format | Max | Auto-inserted |
//! |-------|--------|-----|---------------|
//! | Date | `YYYY-MM-DD` | 10 | `-` before chars 5 and 8 |
//! | Time | `HH:MM:SS±hh` | 11 | `:` before chars 3 and 6 |
//! | Latitude | `±DD.dddd` | 8 | `.` before char 4 |
//! | Longitude | `±DD.dddd` | 8 | `.` before char 4 |
//! | Elevation | `±DDDD` | 5 | |
//!
//! Sign slots only accept ScrollUp (`+`) and ScrollDn (`-`).

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;

use super::keys::Key;
use crate::error::{MountError, Result};

pub const DATE_MAX_LEN: usize = 10;
pub const TIME_MAX_LEN: usize = 11;
pub const COORD_MAX_LEN: usize = 8;
pub const ELEVATION_MAX_LEN: usize = 5;

/// Edit buffer contents at boot
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FormDefaults {
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub time: String,

    #[serde(default = "default_latitude")]
    pub latitude: String,

    #[serde(default = "default_longitude")]
    pub longitude: String,

    #[serde(default = "default_elevation")]
    pub elevation: String,
}

fn default_latitude() -> String { "+39.8491".to_string() }
fn default_longitude() -> String { "-83.9768".to_string() }
fn default_elevation() -> String { "+270".to_string() }

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            date: String::new(),
            time: String::new(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            elevation: default_elevation(),
        }
    }
}

/// Which buffer a key edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Time,
    Latitude,
    Longitude,
    Elevation,
}

/// The five edit buffers plus whatever has been parsed out of them
#[derive(Debug, Clone, PartialEq)]
pub struct HandsetForm {
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub elevation: String,
    current_date: Option<NaiveDate>,
    current_time: Option<DateTime<FixedOffset>>,
    latitude_deg: Option<f64>,
    longitude_deg: Option<f64>,
    elevation_m: Option<i16>,
}

impl Default for HandsetForm {
    fn default() -> Self {
        Self::new(&FormDefaults::default())
    }
}

impl HandsetForm {
    pub fn new(defaults: &FormDefaults) -> Self {
        Self {
            date: defaults.date.clone(),
            time: defaults.time.clone(),
            latitude: defaults.latitude.clone(),
            longitude: defaults.longitude.clone(),
            elevation: defaults.elevation.clone(),
            current_date: None,
            current_time: None,
            latitude_deg: None,
            longitude_deg: None,
            elevation_m: None,
        }
    }

    pub fn buffer(&self, field: Field) -> &str {
        match field {
            Field::Date => &self.date,
            Field::Time => &self.time,
            Field::Latitude => &self.latitude,
            Field::Longitude => &self.longitude,
            Field::Elevation => &self.elevation,
        }
    }

    fn buffer_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Date => &mut self.date,
            Field::Time => &mut self.time,
            Field::Latitude => &mut self.latitude,
            Field::Longitude => &mut self.longitude,
            Field::Elevation => &mut self.elevation,
        }
    }

    /// Apply an edit key to a buffer
    ///
    /// Returns `true` if the key is an edit key for this field, whether or
    /// not the buffer changed (a digit past the length limit is swallowed).
    pub fn edit(&mut self, field: Field, key: Key) -> bool {
        let buf = self.buffer_mut(field);

        if key == Key::Left {
            buf.pop();
            return true;
        }

        let sign = match key {
            Key::ScrollUp => Some('+'),
            Key::ScrollDn => Some('-'),
            _ => None,
        };
        let digit = key.digit();
        if sign.is_none() && digit.is_none() {
            return false;
        }

        let len = buf.len();
        match field {
            Field::Date => {
                if let Some(d) = digit {
                    if len == 4 || len == 7 {
                        buf.push('-');
                        buf.push(d);
                    } else if len < DATE_MAX_LEN {
                        buf.push(d);
                    }
                }
            }
            Field::Time => {
                if len == 8 {
                    if let Some(s) = sign {
                        buf.push(s);
                    }
                } else if let Some(d) = digit {
                    if len == 2 || len == 5 {
                        buf.push(':');
                        buf.push(d);
                    } else if len < TIME_MAX_LEN {
                        buf.push(d);
                    }
                }
            }
            Field::Latitude | Field::Longitude => {
                if len == 0 {
                    if let Some(s) = sign {
                        buf.push(s);
                    }
                } else if let Some(d) = digit {
                    if len == 3 {
                        buf.push('.');
                        buf.push(d);
                    } else if len < COORD_MAX_LEN {
                        buf.push(d);
                    }
                }
            }
            Field::Elevation => {
                if len == 0 {
                    if let Some(s) = sign {
                        buf.push(s);
                    }
                } else if let Some(d) = digit {
                    if len < ELEVATION_MAX_LEN {
                        buf.push(d);
                    }
                }
            }
        }
        true
    }

    /// Parse a buffer and keep the result
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the buffer is not a valid value for its field.
    pub fn commit(&mut self, field: Field) -> Result<()> {
        match field {
            Field::Date => self.current_date = Some(parse_date(&self.date)?),
            Field::Time => self.current_time = Some(parse_time(&self.date, &self.time)?),
            Field::Latitude => self.latitude_deg = Some(parse_degrees(&self.latitude, 90.0)?),
            Field::Longitude => self.longitude_deg = Some(parse_degrees(&self.longitude, 180.0)?),
            Field::Elevation => self.elevation_m = Some(parse_elevation(&self.elevation)?),
        }
        Ok(())
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    pub fn current_time(&self) -> Option<DateTime<FixedOffset>> {
        self.current_time
    }

    pub fn latitude_deg(&self) -> Option<f64> {
        self.latitude_deg
    }

    pub fn longitude_deg(&self) -> Option<f64> {
        self.longitude_deg
    }

    pub fn elevation_m(&self) -> Option<i16> {
        self.elevation_m
    }
}

/// A real calendar date in `YYYY-MM-DD` form
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    DateTime::parse_from_rfc3339(&format!("{}T00:00:00+00:00", date))
        .map(|dt| dt.date_naive())
        .map_err(|e| MountError::Parse(format!("date {:?}: {}", date, e)))
}

/// `HH:MM:SS±hh` on the given date, as an RFC 3339 instant
pub fn parse_time(date: &str, time: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&format!("{}T{}:00", date, time))
        .map_err(|e| MountError::Parse(format!("time {:?} on {:?}: {}", time, date, e)))
}

fn parse_degrees(text: &str, limit: f64) -> Result<f64> {
    let value: f64 = text
        .parse()
        .map_err(|e| MountError::Parse(format!("{:?}: {}", text, e)))?;

    if !value.is_finite() || value.abs() > limit {
        return Err(MountError::Parse(format!("{:?} outside ±{}", text, limit)));
    }
    Ok(value)
}

fn parse_elevation(text: &str) -> Result<i16> {
    text.parse()
        .map_err(|e| MountError::Parse(format!("elevation {:?}: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn type_digits(form: &mut HandsetForm, field: Field, digits: &str) {
        for c in digits.chars() {
            let key = Key::from_name(&c.to_string());
            assert!(form.edit(field, key), "{:?} rejected", c);
        }
    }

    fn blank() -> HandsetForm {
        HandsetForm::new(&FormDefaults {
            date: String::new(),
            time: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            elevation: String::new(),
        })
    }

    #[test]
    fn test_defaults_match_home_location() {
        let form = HandsetForm::default();
        assert_eq!(form.latitude, "+39.8491");
        assert_eq!(form.longitude, "-83.9768");
        assert_eq!(form.elevation, "+270");
        assert!(form.date.is_empty());
    }

    #[test]
    fn test_date_inserts_dashes() {
        let mut form = blank();
        type_digits(&mut form, Field::Date, "20240101");
        assert_eq!(form.date, "2024-01-01");

        // Full buffer swallows further digits
        type_digits(&mut form, Field::Date, "9");
        assert_eq!(form.date, "2024-01-01");
    }

    #[test]
    fn test_date_parses() {
        let mut form = blank();
        type_digits(&mut form, Field::Date, "20240101");
        form.commit(Field::Date).unwrap();
        let date = form.current_date().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 1));
    }

    #[test]
    fn test_impossible_date_fails() {
        let mut form = blank();
        type_digits(&mut form, Field::Date, "20241350");
        assert_eq!(form.date, "2024-13-50");
        assert!(matches!(form.commit(Field::Date), Err(MountError::Parse(_))));
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("2024-02-29").is_ok());
        assert!(parse_date("2024-1").is_err());
    }

    #[test]
    fn test_left_deletes_last_char() {
        let mut form = blank();
        type_digits(&mut form, Field::Date, "20241");
        assert_eq!(form.date, "2024-1");
        form.edit(Field::Date, Key::Left);
        assert_eq!(form.date, "2024-");
        form.edit(Field::Date, Key::Left);
        form.edit(Field::Date, Key::Left);
        assert_eq!(form.date, "202");

        let mut empty = blank();
        assert!(empty.edit(Field::Elevation, Key::Left));
        assert!(empty.elevation.is_empty());
    }

    #[test]
    fn test_time_inserts_colons_and_sign() {
        let mut form = blank();
        type_digits(&mut form, Field::Time, "223015");
        assert_eq!(form.time, "22:30:15");

        // Only a sign fits at position 8
        form.edit(Field::Time, Key::Five);
        assert_eq!(form.time, "22:30:15");
        form.edit(Field::Time, Key::ScrollDn);
        type_digits(&mut form, Field::Time, "054");
        assert_eq!(form.time, "22:30:15-05");
    }

    #[test]
    fn test_time_parses_against_date() {
        let mut form = blank();
        type_digits(&mut form, Field::Date, "20240315");
        type_digits(&mut form, Field::Time, "223015");
        form.edit(Field::Time, Key::ScrollUp);
        type_digits(&mut form, Field::Time, "02");

        form.commit(Field::Time).unwrap();
        let time = form.current_time().unwrap();
        assert_eq!((time.hour(), time.minute(), time.second()), (22, 30, 15));
        assert_eq!(time.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_time_without_offset_fails() {
        assert!(parse_time("2024-03-15", "22:30:15").is_err());
        assert!(parse_time("2024-03-15", "25:00:00+00").is_err());
    }

    #[test]
    fn test_latitude_sign_slot_and_decimal_point() {
        let mut form = blank();
        // Digits are refused until a sign is entered
        form.edit(Field::Latitude, Key::Three);
        assert!(form.latitude.is_empty());

        form.edit(Field::Latitude, Key::ScrollDn);
        type_digits(&mut form, Field::Latitude, "33868899");
        assert_eq!(form.latitude, "-33.8688");

        form.commit(Field::Latitude).unwrap();
        assert_eq!(form.latitude_deg(), Some(-33.8688));
    }

    #[test]
    fn test_coordinates_are_range_checked() {
        let mut form = blank();
        form.latitude = "+91.0000".into();
        assert!(form.commit(Field::Latitude).is_err());

        form.longitude = "-179.999".into();
        form.commit(Field::Longitude).unwrap();
        form.longitude = "+181.0".into();
        assert!(form.commit(Field::Longitude).is_err());
        form.longitude = "+".into();
        assert!(form.commit(Field::Longitude).is_err());
    }

    #[test]
    fn test_elevation_edit_and_parse() {
        let mut form = blank();
        form.edit(Field::Elevation, Key::ScrollUp);
        type_digits(&mut form, Field::Elevation, "12345");
        assert_eq!(form.elevation, "+1234");

        form.commit(Field::Elevation).unwrap();
        assert_eq!(form.elevation_m(), Some(1234));

        form.elevation = "-".into();
        assert!(form.commit(Field::Elevation).is_err());
    }

    #[test]
    fn test_non_edit_keys_are_not_consumed() {
        let mut form = blank();
        for key in [Key::Up, Key::Down, Key::Right, Key::Esc, Key::Enter, Key::Setup] {
            assert!(!form.edit(Field::Date, key));
        }
    }
}
