use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    // Dispatch errors
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    // Session errors
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Session closed: {0}")]
    SessionClosed(String),

    // Startup errors
    #[error("Could not bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

// Result type alias for convenience
pub type AdvisorResult<T> = Result<T, AdvisorError>;

// For compatibility with code that uses anyhow::Error at the seams
impl From<anyhow::Error> for AdvisorError {
    fn from(err: anyhow::Error) -> Self {
        AdvisorError::Internal(err.to_string())
    }
}
