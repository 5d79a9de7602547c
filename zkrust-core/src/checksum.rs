//! Frame checksum
//!
//! The terminal sums the frame as little-endian 16-bit words with the
//! checksum field zeroed, folds the sum back into 16 bits by subtracting
//! 0xFFFF, and sends the ones-complement. Replies are not guaranteed to carry
//! a correct value, so callers treat verification as advisory.

use tracing::trace;

/// Calculate a frame checksum
///
/// ```text
/// 1. Buffer: [cmd_lo, cmd_hi, 0, 0, sess_lo, sess_hi, reply_lo, reply_hi, ...payload]
/// 2. Sum all 16-bit words (little-endian); an odd tail byte counts as a low byte
/// 3. While sum > 0xFFFF: sum -= 0xFFFF
/// 4. Return !sum as u16
/// ```
///
/// # Examples
///
/// ```
/// use zkrust_core::checksum;
///
/// // CMD_CONNECT, session 0, reply 0
/// assert_eq!(checksum::calculate(1000, 0, 0, &[]), 0xFC17);
/// ```
pub fn calculate(command: u16, session_id: u16, reply_id: u16, payload: &[u8]) -> u16 {
    let header = [command, 0, session_id, reply_id];

    let mut sum: u32 = header.iter().map(|&word| word as u32).sum();
    sum = fold(sum);

    for chunk in payload.chunks(2) {
        let word = match *chunk {
            [lo, hi] => u16::from_le_bytes([lo, hi]) as u32,
            [lo] => lo as u32,
            _ => 0,
        };
        sum = fold(sum + word);
    }

    let checksum = !(sum as u16);

    trace!(
        command,
        session_id,
        reply_id,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(
    command: u16,
    session_id: u16,
    reply_id: u16,
    payload: &[u8],
    expected: u16,
) -> bool {
    calculate(command, session_id, reply_id, payload) == expected
}

fn fold(mut sum: u32) -> u32 {
    while sum > 0xFFFF {
        sum -= 0xFFFF;
    }
    sum
}
