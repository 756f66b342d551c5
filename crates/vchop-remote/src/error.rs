//! Remote client error types.

use thiserror::Error;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Transport-level failures are transient and worth retrying; an
    /// explicit rejection from the service is not.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Io(_))
    }
}
