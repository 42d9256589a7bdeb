use thiserror::Error;

/// Failures at the boundary with the persistence and analysis services
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The analysis service answered but declined to produce an analysis.
    #[error("analysis rejected: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Malformed(err.to_string())
    }
}
