use std::fmt;

/// Failure of one data feed request. Never fatal: callers degrade the feed to empty.
#[derive(Debug)]
pub enum FeedError {
    Request(String),
    Status(u16, String),
    NonJsonResponse(String),
    Parse(String),
}

impl FeedError {
    /// Rate limits, server errors and transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Request(_) => true,
            FeedError::Status(code, _) => *code == 429 || *code >= 500,
            FeedError::NonJsonResponse(_) | FeedError::Parse(_) => false,
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeedError::Request(msg) => write!(f, "Request error: {}", msg),
            FeedError::Status(code, preview) => write!(f, "HTTP {}: {}", code, preview),
            FeedError::NonJsonResponse(preview) => write!(f, "Non-JSON response: {}", preview),
            FeedError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}
