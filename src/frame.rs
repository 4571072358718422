//! Fixed-capacity byte buffers shared by the queues, the schedule codec and
//! the slot transport port.
//!
//! Every wire- or queue-facing buffer in this crate is a `heapless::Vec`
//! under the hood — no heap allocation on the hot path.

use heapless::Vec;

/// Largest frame the slot transport will ever move in one flood, including
/// the schedule header itself.
pub const MAX_PKT_LEN: usize = 128;

/// Largest application payload a data slot can carry.
pub const MAX_DATA_PKT_LEN: usize = 64;

/// A single application-layer payload, length-tracked, capped at
/// [`MAX_DATA_PKT_LEN`].
pub type DataFrame = Vec<u8, MAX_DATA_PKT_LEN>;

/// A raw wire frame as it goes in or out of the slot transport, capped at
/// [`MAX_PKT_LEN`].
pub type WireFrame = Vec<u8, MAX_PKT_LEN>;

/// Build a [`DataFrame`] from a byte slice, truncating silently if the
/// slice is longer than [`MAX_DATA_PKT_LEN`] — callers that care about
/// truncation should check `slice.len()` themselves first.
pub fn data_frame_from(slice: &[u8]) -> DataFrame {
    let mut f = DataFrame::new();
    let n = slice.len().min(MAX_DATA_PKT_LEN);
    // `extend_from_slice` cannot fail here: `n` is bounded by the Vec's capacity.
    let _ = f.extend_from_slice(&slice[..n]);
    f
}
