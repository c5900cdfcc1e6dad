//! Coordinator configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::progress::ProgressTransport;

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How exchange indices cross from the worker to the observer
    #[serde(rename = "progress-transport", default)]
    pub progress_transport: ProgressTransport,

    /// Thread name given to each run's worker
    #[serde(rename = "worker-name", default = "default_worker_name")]
    pub worker_name: String,
}

fn default_worker_name() -> String {
    debug!("default_worker_name: called");
    "bgsort-worker".to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            progress_transport: ProgressTransport::default(),
            worker_name: default_worker_name(),
        }
    }
}

impl CoordinatorConfig {
    /// Config using the packed scalar transport
    pub fn packed() -> Self {
        Self {
            progress_transport: ProgressTransport::Packed,
            ..Default::default()
        }
    }
}
