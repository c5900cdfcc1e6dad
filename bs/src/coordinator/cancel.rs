//! Cooperative cancellation flag shared between coordinator and worker

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Shared cancellation flag
///
/// Cheap to clone and `Send`, so it can be handed to other threads (signal
/// handlers, timers) that need to stop the current run. Setting it is
/// advisory: the algorithm stops the next time it polls.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns true if this call set the flag.
    pub fn cancel(&self) -> bool {
        let newly_set = !self.inner.swap(true, Ordering::AcqRel);
        debug!(newly_set, "CancelFlag::cancel: called");
        newly_set
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}
