//! Crate-wide error hierarchy for lsp-resolver.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("process spawn error: {0}")]
    Spawn(String),

    #[error("lsp protocol error: {0}")]
    Protocol(String),

    #[error("lsp server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("server connection closed")]
    Closed,

    #[error("no language server for {0}")]
    Unavailable(String),

    #[error("build cancelled")]
    Cancelled,
}

impl Error {
    /// Transport-level failures retry with backoff; the rest do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::SerdeJson(_)
                | Error::Protocol(_)
                | Error::Server { .. }
                | Error::Timeout
                | Error::Closed
        )
    }
}
