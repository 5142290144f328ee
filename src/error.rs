/*!
Error types shared by every stage of the pipeline
*/
use thiserror::Error;

/// Errors raised while collecting, modelling or reporting instrument data
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unwritable CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed or unwritable JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A vendor answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status {
        /// The status code returned
        status: u16,
        /// The URL requested
        url: String,
    },

    /// Failure inside libtorch
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    /// A vendor payload or page could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// A series is too short for the requested operation
    #[error("Insufficient data: have {have} points, need at least {need}")]
    InsufficientData {
        /// Points available
        have: usize,
        /// Points required
        need: usize,
    },

    /// A ticker returned no usable data
    #[error("No data for {ticker}")]
    NoData {
        /// The ticker requested
        ticker: String,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for closecast operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Error::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Error::Parse(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_retryability() {
        let status = |status| Error::Status {
            status,
            url: "https://example.com".into(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!Error::parse("bad").is_retryable());
        assert!(!Error::NoData { ticker: "X".into() }.is_retryable());
    }
}
