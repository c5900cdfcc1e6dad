//! Coordinator error types

use thiserror::Error;

/// Errors reported synchronously by the coordinator's control surface
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Cannot {operation} while a sort is running")]
    AlreadyRunning { operation: &'static str },

    #[error("No array configured to sort")]
    MissingArray,

    #[error("No sort algorithm configured")]
    MissingAlgorithm,

    #[error("Array of {len} elements exceeds the packed progress limit of {limit}")]
    ArrayTooLong { len: usize, limit: usize },

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl CoordinatorError {
    /// Operation attempted in the wrong state
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }

    /// Array or algorithm missing at start
    pub fn is_missing_configuration(&self) -> bool {
        matches!(self, Self::MissingArray | Self::MissingAlgorithm)
    }
}
