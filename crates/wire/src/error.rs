use thiserror::Error;

/// Errors that can occur while framing or moving frames over a stream.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid command {0}: must be between 0 and 255")]
    InvalidCommand(u32),

    #[error("payload too large: {0} bytes exceeds the 4-byte length field")]
    PayloadTooLarge(usize),

    #[error("connection closed after {received} of {expected} bytes")]
    ConnectionClosed { expected: usize, received: usize },

    #[error("payload serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Whether this error means the peer went away rather than misbehaved.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
