//! Message types carried from the worker thread to the coordinator

use crate::algorithm::SortOutcome;
use crate::progress::Progress;

/// Messages sent by the worker, drained on the observer context
#[derive(Debug)]
pub(crate) enum WorkerMessage {
    /// The algorithm reported an exchange; values are post-swap
    Exchange {
        progress: Progress,
        first_value: i32,
        second_value: i32,
    },

    /// The algorithm is done; always the last message of a run
    Finished {
        array: Vec<i32>,
        result: RunResult,
        exchanges: usize,
    },
}

/// How the algorithm left the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunResult {
    Returned(SortOutcome),
    Faulted(String),
}
