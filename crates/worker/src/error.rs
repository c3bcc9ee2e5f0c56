use std::io;

use dts_wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to connect to scheduler at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("processing failed: {0}")]
    Processing(String),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl WorkerError {
    /// True when the scheduler went away rather than something breaking locally.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Wire(e) => e.is_disconnect(),
            _ => false,
        }
    }
}
