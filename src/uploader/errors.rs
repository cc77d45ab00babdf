// Error types for the upload pipeline

use std::fmt;

#[derive(Debug, Clone)]
pub enum UploadError {
    /// Token refresh failed - nothing downstream can proceed without a token
    Auth(String),

    /// Metadata field rejected before any network call
    Validation(String),

    /// Non-success HTTP status from the metadata or upload endpoints
    RemoteRejection { status: u16, body: String },

    /// Local file missing or unreadable
    Io(String),

    /// Transport-level failure (timeout, connection refused, bad proxy)
    Network(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(body) => write!(f, "Token refresh failed: {}", body),
            Self::Validation(msg) => write!(f, "Invalid metadata: {}", msg),
            Self::RemoteRejection { status, body } => {
                write!(f, "Endpoint rejected request (HTTP {}): {}", status, body)
            }
            Self::Io(msg) => write!(f, "File error: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts are retryable on the next scheduled run, but within a
        // single run they end the attempt like any other transport failure.
        if e.is_timeout() {
            Self::Network(format!("request timed out: {}", e))
        } else {
            Self::Network(e.to_string())
        }
    }
}
