//! Packing of an index pair into a single bounded scalar
//!
//! Some transports only carry one bounded integer per progress report. The
//! pair `(first, second)` is packed as `first * 1000 + second`, so each index
//! must stay below [`PACKED_INDEX_LIMIT`]. Anything larger would collide and
//! is rejected instead.

use thiserror::Error;

/// Exclusive upper bound for either index of a packed pair
pub const PACKED_INDEX_LIMIT: usize = 1000;

/// Errors from packing an index pair
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Index {index} cannot be packed (limit is {limit})")]
    IndexOutOfRange { index: usize, limit: usize },
}

/// Pack an index pair into one scalar
pub fn encode(first: usize, second: usize) -> Result<u32, CodecError> {
    for index in [first, second] {
        if index >= PACKED_INDEX_LIMIT {
            return Err(CodecError::IndexOutOfRange {
                index,
                limit: PACKED_INDEX_LIMIT,
            });
        }
    }
    // Both factors are < 1000, so the result fits comfortably in u32
    Ok((first * PACKED_INDEX_LIMIT + second) as u32)
}

/// Unpack a scalar produced by [`encode`]
pub fn decode(scalar: u32) -> (usize, usize) {
    let scalar = scalar as usize;
    (scalar / PACKED_INDEX_LIMIT, scalar % PACKED_INDEX_LIMIT)
}
