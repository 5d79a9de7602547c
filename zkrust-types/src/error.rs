//! Record codec errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{record} too short: expected {expected} bytes, got {actual}")]
    Truncated {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Packed value {0:#010X} is not a calendar date-time")]
    InvalidTimestamp(u32),

    #[error("Slot {slot} is outside the {kind} range")]
    InvalidSlot {
        kind: &'static str,
        slot: u8,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fail with [`Error::Truncated`] unless `buf` holds at least `expected` bytes
pub(crate) fn ensure_len(record: &'static str, buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(Error::Truncated {
            record,
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}
