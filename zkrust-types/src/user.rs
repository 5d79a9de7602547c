//! User records
//!
//! # Wire layout (72 bytes)
//!
//! ```text
//! [0:2]   uid            LE u16
//! [2]     role           0 = user, 14 = admin
//! [3:11]  password       NUL-padded
//! [11:35] name           NUL-padded
//! [35:39] card number    LE u32
//! [39:48] group block    0x01 then 8 NULs
//! [48:57] user id        NUL-padded
//! [57:72] reserved
//! ```

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::field::{put_padded, read_str};

/// Role byte of an ordinary user
pub const LEVEL_USER: u8 = 0;

/// Lowest role byte the terminal treats as an administrator
pub const LEVEL_ADMIN: u8 = 14;

/// A user enrolled on the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserRecord {
    /// Internal slot number, 1..=65535
    pub uid: u16,

    /// Enrollment number shown on the terminal (at most 9 bytes)
    pub user_id: String,

    /// Display name (at most 24 bytes)
    pub name: String,

    /// Keypad password (at most 8 bytes)
    pub password: String,

    /// Privilege byte
    pub role: u8,

    /// Card number in decimal, empty when no card is assigned
    pub card_no: String,
}

impl UserRecord {
    /// Encoded size of one record
    pub const SIZE: usize = 72;

    /// Bytes preceding the first record in a user table stream
    ///
    /// The DATA header and the 4-byte size word, plus one pad byte.
    pub const STREAM_PREFIX: usize = 12;

    pub const MAX_USER_ID: usize = 9;
    pub const MAX_NAME: usize = 24;
    pub const MAX_PASSWORD: usize = 8;
    pub const MAX_CARD_DIGITS: usize = 10;

    /// Create a user with no password, no card and the ordinary role
    pub fn new(uid: u16, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid,
            user_id: user_id.into(),
            name: name.into(),
            password: String::new(),
            role: LEVEL_USER,
            card_no: String::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_role(mut self, role: u8) -> Self {
        self.role = role;
        self
    }

    pub fn with_card(mut self, card_no: impl Into<String>) -> Self {
        self.card_no = card_no.into();
        self
    }

    /// Check if the role grants administrator rights
    pub fn is_admin(&self) -> bool {
        self.role >= LEVEL_ADMIN
    }

    /// Numeric card value as stored on the wire
    pub fn card_value(&self) -> Result<u32> {
        if self.card_no.is_empty() {
            return Ok(0);
        }

        if self.card_no.len() > Self::MAX_CARD_DIGITS
            || !self.card_no.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::Validation(format!(
                "card number must be at most {} digits, got {:?}",
                Self::MAX_CARD_DIGITS,
                self.card_no
            )));
        }

        self.card_no
            .parse::<u32>()
            .map_err(|_| Error::Validation(format!("card number {} does not fit in 32 bits", self.card_no)))
    }

    /// Check field limits before the record is sent to a terminal
    pub fn validate(&self) -> Result<()> {
        if self.uid == 0 {
            return Err(Error::Validation("uid 0 is reserved".into()));
        }

        let limits = [
            ("user id", &self.user_id, Self::MAX_USER_ID),
            ("name", &self.name, Self::MAX_NAME),
            ("password", &self.password, Self::MAX_PASSWORD),
        ];
        for (field, value, max) in limits {
            if value.len() > max {
                return Err(Error::Validation(format!(
                    "{} is {} bytes, limit is {}",
                    field,
                    value.len(),
                    max
                )));
            }
        }

        self.card_value().map(|_| ())
    }

    /// Encode the record as the payload of a user write
    pub fn encode(&self) -> Result<Bytes> {
        self.validate()?;
        let card = self.card_value()?;

        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u16_le(self.uid);
        buf.put_u8(self.role);
        put_padded(&mut buf, self.password.as_bytes(), Self::MAX_PASSWORD);
        put_padded(&mut buf, self.name.as_bytes(), Self::MAX_NAME);
        buf.put_u32_le(card);
        put_padded(&mut buf, &[1], 9);
        put_padded(&mut buf, self.user_id.as_bytes(), Self::MAX_USER_ID);
        buf.put_bytes(0, 15);

        Ok(buf.freeze())
    }

    /// Decode one 72-byte record
    ///
    /// An empty name falls back to the user id.
    pub fn decode(record: &[u8; Self::SIZE]) -> Self {
        let uid = LittleEndian::read_u16(&record[0..2]);
        let card = LittleEndian::read_u32(&record[35..39]);
        let user_id = read_str(&record[48..57]);

        let mut name = read_str(&record[11..35]);
        if name.is_empty() {
            name = user_id.clone();
        }

        Self {
            uid,
            user_id,
            name,
            password: read_str(&record[3..11]),
            role: record[2],
            card_no: if card == 0 { String::new() } else { card.to_string() },
        }
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User[{}] {} ({})", self.uid, self.user_id, self.name)
    }
}

/// Decode a user table stream
///
/// Records are read back to back after the stream prefix until fewer than
/// 72 bytes remain. Streams too short for one record yield an empty list.
pub fn decode_users(stream: &[u8]) -> Vec<UserRecord> {
    let Some(body) = stream.get(UserRecord::STREAM_PREFIX..) else {
        return Vec::new();
    };

    body.chunks_exact(UserRecord::SIZE)
        .filter_map(|chunk| <&[u8; UserRecord::SIZE]>::try_from(chunk).ok())
        .map(UserRecord::decode)
        .collect()
}
