//! Fixed-width field helpers shared by the record codecs

use bytes::{BufMut, BytesMut};

/// Bytes of `field` up to the first NUL
pub(crate) fn until_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

/// Text of a NUL-padded field, decoded as lossy UTF-8
pub(crate) fn read_str(field: &[u8]) -> String {
    String::from_utf8_lossy(until_nul(field)).into_owned()
}

/// Write `value` into a field of `width` bytes, padding with NULs
///
/// Callers validate lengths first; anything past `width` is cut off.
pub(crate) fn put_padded(buf: &mut BytesMut, value: &[u8], width: usize) {
    let used = value.len().min(width);
    buf.put_slice(&value[..used]);
    buf.put_bytes(0, width - used);
}
