/// Errors raised while running a query against the metrics backend.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The backend answered with anything other than `200 OK`.
    #[error("Bad status code: {status}")]
    Backend { status: u16 },

    /// The body was not JSON or had no `data.result` list of samples.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure (connect, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),
}

impl QueryError {
    /// HTTP status carried by a [`QueryError::Backend`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status } => Some(*status),
            _ => None,
        }
    }
}
