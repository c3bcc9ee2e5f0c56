use dts_wire::WireError;
use thiserror::Error;

use crate::task::TaskId;

/// Errors raised by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("no worker available")]
    NoCapacity,

    #[error("failed to dispatch task {task_id}: {source}")]
    DispatchFailure {
        task_id: TaskId,
        #[source]
        source: WireError,
    },

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
