//! Helpers for explicit network byte-order conversions.
//!
//! Every multi-byte field in the chunk header travels big-endian. The header
//! is a run of `u16` fields, so the array helpers convert the whole run at
//! once.

/// Serialise a `u16` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use chunkcast::byte_order::write_network_u16;
///
/// assert_eq!(write_network_u16(0x1234), [0x12, 0x34]);
/// ```
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use chunkcast::byte_order::read_network_u16;
///
/// assert_eq!(read_network_u16([0x12, 0x34]), 0x1234);
/// ```
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u16::from_be_bytes(bytes)
}

/// Serialise consecutive `u16` fields in network byte order.
///
/// # Examples
///
/// ```
/// use chunkcast::byte_order::write_network_u16s;
///
/// let wire: [u8; 4] = write_network_u16s([0x0102, 0x0304]);
/// assert_eq!(wire, [1, 2, 3, 4]);
/// ```
#[must_use]
pub fn write_network_u16s<const N: usize, const B: usize>(fields: [u16; N]) -> [u8; B] {
    debug_assert_eq!(N * 2, B, "byte array must hold every field");
    let mut out = [0_u8; B];
    for (slot, field) in out.chunks_exact_mut(2).zip(fields) {
        slot.copy_from_slice(&write_network_u16(field));
    }
    out
}

/// Parse consecutive network-order `u16` fields.
///
/// # Examples
///
/// ```
/// use chunkcast::byte_order::read_network_u16s;
///
/// assert_eq!(read_network_u16s::<2, 4>(&[1, 2, 3, 4]), [0x0102, 0x0304]);
/// ```
#[must_use]
pub fn read_network_u16s<const N: usize, const B: usize>(bytes: &[u8; B]) -> [u16; N] {
    debug_assert_eq!(N * 2, B, "byte array must hold every field");
    let mut fields = [0_u16; N];
    for (field, pair) in fields.iter_mut().zip(bytes.chunks_exact(2)) {
        *field = read_network_u16([pair[0], pair[1]]);
    }
    fields
}
