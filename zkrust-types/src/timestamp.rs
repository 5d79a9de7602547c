//! Packed date-time encoding
//!
//! Terminals store a date-time as a single 32-bit integer built by nested
//! multiply-add over a 31-day month:
//!
//! ```text
//! ((((((year % 100) * 12 + (month - 1)) * 31 + (day - 1)) * 24 + hour) * 60 + minute) * 60 + second
//! ```
//!
//! The century is not stored; decoded years fall in 2000..=2099.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result, ensure_len};

/// Pack a date-time
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use zkrust_types::timestamp;
///
/// let dt = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(8, 30, 0).unwrap();
/// assert_eq!(timestamp::encode(&dt), 772_619_400);
/// ```
pub fn encode(dt: &NaiveDateTime) -> u32 {
    let year = dt.year().rem_euclid(100) as u32;

    let days = (year * 12 + dt.month0()) * 31 + dt.day0();
    ((days * 24 + dt.hour()) * 60 + dt.minute()) * 60 + dt.second()
}

/// Unpack a date-time
///
/// Fails when the packed fields do not name a real date (e.g. February 30th).
pub fn decode(value: u32) -> Result<NaiveDateTime> {
    let mut t = value;

    let second = t % 60;
    t /= 60;
    let minute = t % 60;
    t /= 60;
    let hour = t % 24;
    t /= 24;
    let day = t % 31 + 1;
    t /= 31;
    let month = t % 12 + 1;
    t /= 12;
    let year = 2000 + (t % 100) as i32;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or(Error::InvalidTimestamp(value))
}

/// Unpack a date-time stored as a little-endian field
pub fn decode_le(field: &[u8]) -> Result<NaiveDateTime> {
    ensure_len("timestamp", field, 4)?;
    decode(LittleEndian::read_u32(field))
}

/// Pack a date-time into its little-endian wire form
pub fn encode_le(dt: &NaiveDateTime) -> [u8; 4] {
    encode(dt).to_le_bytes()
}
