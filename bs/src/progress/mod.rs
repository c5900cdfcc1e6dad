//! Progress payloads carried from the worker to the observer
//!
//! By default an exchange crosses the bridge as a structured index pair with
//! no size ceiling. The packed transport squeezes the pair into a single
//! scalar via [`codec`] and is limited to arrays of at most
//! [`PACKED_INDEX_LIMIT`] elements.

pub mod codec;

use serde::{Deserialize, Serialize};

pub use codec::{CodecError, PACKED_INDEX_LIMIT, decode, encode};

/// How exchange indices travel across the worker/observer bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressTransport {
    /// Index pair sent as-is
    #[default]
    Structured,
    /// Index pair packed into one bounded scalar
    Packed,
}

impl ProgressTransport {
    /// Longest array this transport can describe, if bounded
    pub fn max_len(self) -> Option<usize> {
        match self {
            Self::Structured => None,
            Self::Packed => Some(PACKED_INDEX_LIMIT),
        }
    }
}

impl std::fmt::Display for ProgressTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Packed => write!(f, "packed"),
        }
    }
}

/// One exchange report as it crosses the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pair { first: usize, second: usize },
    Packed(u32),
}

impl Progress {
    /// Build the payload for `transport`
    pub fn new(transport: ProgressTransport, first: usize, second: usize) -> Result<Self, CodecError> {
        match transport {
            ProgressTransport::Structured => Ok(Self::Pair { first, second }),
            ProgressTransport::Packed => encode(first, second).map(Self::Packed),
        }
    }

    /// Recover the `(first, second)` index pair
    pub fn indices(self) -> (usize, usize) {
        match self {
            Self::Pair { first, second } => (first, second),
            Self::Packed(scalar) => decode(scalar),
        }
    }
}
