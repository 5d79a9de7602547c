//! Fingerprint and face templates
//!
//! Both kinds share one envelope and differ only in their slot range:
//!
//! ```text
//! [0:2] size   LE u16, length of the raw template
//! [2:4] uid    LE u16
//! [4]   slot   finger 0..=9, face 50..=54
//! [5]   flag   1 = valid
//! [6:]  raw template
//! ```

use std::fmt;
use std::ops::RangeInclusive;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result, ensure_len};

/// Flag byte of a valid template
pub const FLAG_VALID: u8 = 1;

/// Which biometric a template holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemplateKind {
    Fingerprint,
    Face,
}

impl TemplateKind {
    /// Slot ids reserved for this kind
    pub fn slots(self) -> RangeInclusive<u8> {
        match self {
            Self::Fingerprint => 0..=9,
            Self::Face => 50..=54,
        }
    }

    /// Kind owning `slot`, if any
    pub fn of_slot(slot: u8) -> Option<Self> {
        [Self::Fingerprint, Self::Face]
            .into_iter()
            .find(|kind| kind.slots().contains(&slot))
    }

    /// Fail with [`Error::InvalidSlot`] unless `slot` belongs to this kind
    pub fn check_slot(self, slot: u8) -> Result<()> {
        if self.slots().contains(&slot) {
            Ok(())
        } else {
            Err(Error::InvalidSlot {
                kind: self.name(),
                slot,
            })
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::Face => "face",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One enrolled template
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BiometricTemplate {
    pub owner_uid: u16,
    pub slot_id: u8,

    /// Raw template length as announced in the envelope
    pub size: u16,

    pub flag: u8,
    pub raw: Bytes,

    /// Coarse 0..=100 score, see [`quality`]
    pub quality: u8,
}

impl BiometricTemplate {
    /// Envelope header size
    pub const HEADER_SIZE: usize = 6;

    /// Wrap a raw template for `slot`
    ///
    /// # Errors
    ///
    /// - `slot` is outside the range of `kind`
    /// - `raw` is empty or longer than 65535 bytes
    pub fn new(kind: TemplateKind, owner_uid: u16, slot_id: u8, raw: impl Into<Bytes>) -> Result<Self> {
        kind.check_slot(slot_id)?;

        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::Validation("template data is empty".into()));
        }
        let size = u16::try_from(raw.len()).map_err(|_| {
            Error::Validation(format!("template of {} bytes exceeds 65535", raw.len()))
        })?;

        Ok(Self {
            owner_uid,
            slot_id,
            size,
            flag: FLAG_VALID,
            quality: quality(&raw),
            raw,
        })
    }

    /// Kind implied by the slot id
    pub fn kind(&self) -> Option<TemplateKind> {
        TemplateKind::of_slot(self.slot_id)
    }

    /// Encode the envelope, which is also the template write payload
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE + self.raw.len());
        buf.put_u16_le(self.size);
        buf.put_u16_le(self.owner_uid);
        buf.put_u8(self.slot_id);
        buf.put_u8(self.flag);
        buf.put_slice(&self.raw);
        buf.freeze()
    }

    /// Decode an envelope
    pub fn decode(envelope: &[u8]) -> Result<Self> {
        ensure_len("template envelope", envelope, Self::HEADER_SIZE)?;

        let raw = Bytes::copy_from_slice(&envelope[Self::HEADER_SIZE..]);
        Ok(Self {
            size: LittleEndian::read_u16(&envelope[0..2]),
            owner_uid: LittleEndian::read_u16(&envelope[2..4]),
            slot_id: envelope[4],
            flag: envelope[5],
            quality: quality(&raw),
            raw,
        })
    }

    /// Build a template from a bulk read of one slot
    ///
    /// The terminal streams only the raw bytes; an empty stream means the
    /// slot is unused.
    pub fn from_stream(owner_uid: u16, slot_id: u8, raw: Bytes) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        Some(Self {
            owner_uid,
            slot_id,
            size: u16::try_from(raw.len()).unwrap_or(u16::MAX),
            flag: FLAG_VALID,
            quality: quality(&raw),
            raw,
        })
    }
}

impl fmt::Display for BiometricTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Template[uid={}, slot={}, {} bytes, quality={}]",
            self.owner_uid, self.slot_id, self.size, self.quality
        )
    }
}

/// Payload selecting one template slot of a user
pub fn request_payload(uid: u16, slot: u8) -> [u8; 3] {
    let [lo, hi] = uid.to_le_bytes();
    [lo, hi, slot]
}

/// Placeholder quality score
///
/// Mean of the first 100 bytes scaled by 0.4 and capped at 100. This is not a
/// biometric measure; it only gives callers a bounded number to sort by.
pub fn quality(raw: &[u8]) -> u8 {
    let sample = &raw[..raw.len().min(100)];
    if sample.is_empty() {
        return 0;
    }

    let sum: u32 = sample.iter().map(|&b| b as u32).sum();
    let score = (sum as f64 / sample.len() as f64) * 0.4;
    score.min(100.0) as u8
}

/// Lowest slot of `kind` not listed in `occupied`
pub fn first_free_slot(kind: TemplateKind, occupied: &[u8]) -> Option<u8> {
    kind.slots().find(|slot| !occupied.contains(slot))
}
