//! Error types for the token scanner

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the token scanner
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Provider errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { status: u16, endpoint: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // Analysis errors
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    // Export errors
    #[error("Export failed for {path}: {reason}")]
    Export { path: String, reason: String },

    // Agent errors
    #[error("Agent {agent} failed: {reason}")]
    Agent { agent: String, reason: String },

    #[error("Agent {0} timed out")]
    AgentTimeout(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error came from talking to the market data provider
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::HttpStatus { .. } | Error::Deserialization(_)
        )
    }

    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::AgentTimeout(_) => true,
            // 429 and 5xx are worth another try next cycle
            Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
