//! Frame format: [8 bytes length (big-endian u64)][payload bytes]
//!
//! The length counts payload bytes only, not the prefix itself.
//! Frames are written back-to-back: no header, no padding, no checksum.
//!
//! ```text
//! +------------------+----------------+
//! | length           | payload        |
//! | (u64, BE)        | ([u8; length]) |
//! | 8 bytes          | variable       |
//! +------------------+----------------+
//! ```

/// Width of the length prefix in bytes.
pub const LEN_WIDTH: usize = 8;

/// Width of the length prefix as a file offset delta.
pub const LEN_WIDTH_U64: u64 = LEN_WIDTH as u64;

/// Encode a payload length as the on-disk prefix.
pub fn encode_len(len: u64) -> [u8; LEN_WIDTH] {
    len.to_be_bytes()
}

/// Decode an on-disk prefix back into a payload length.
pub fn decode_len(prefix: [u8; LEN_WIDTH]) -> u64 {
    u64::from_be_bytes(prefix)
}

/// Total bytes a frame occupies on disk for a payload of `payload_len` bytes.
pub fn frame_width(payload_len: usize) -> u64 {
    LEN_WIDTH_U64 + payload_len as u64
}

/// Payload length as an in-memory buffer size.
///
/// `None` if `len` cannot be allocated on this platform (above `isize::MAX`).
pub fn payload_len(len: u64) -> Option<usize> {
    usize::try_from(len)
        .ok()
        .filter(|&n| n <= isize::MAX as usize)
}

/// Build a complete frame in memory.
///
/// The store itself never builds frames this way: it writes the prefix and the
/// payload into its buffer separately. This is for assembling raw store bytes
/// directly (fixtures, offline tooling).
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(LEN_WIDTH + payload.len());
    frame.extend_from_slice(&encode_len(payload.len() as u64));
    frame.extend_from_slice(payload);
    frame
}
