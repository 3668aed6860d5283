use simlog_protocol::LoadFailureKind;
use thiserror::Error;

/// Result type for tabular loading
pub type Result<T> = std::result::Result<T, TabularError>;

/// Errors that can occur while reading or parsing a delimited resource
#[derive(Error, Debug)]
pub enum TabularError {
    /// Resource does not exist or cannot be read
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Network transport failed before a response was received
    #[error("Failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },

    /// Malformed delimited content
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Load exceeded the configured deadline
    #[error("Loading {location} timed out after {millis} ms")]
    Timeout { location: String, millis: u128 },

    /// Location string is neither a usable path nor an http(s) URL
    #[error("Invalid resource location: {0}")]
    InvalidLocation(String),

    /// Background parse task died
    #[error("Parse task failed: {0}")]
    Task(String),
}

impl TabularError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Category reported to clients when this failure is isolated per file.
    pub fn failure_kind(&self) -> LoadFailureKind {
        match self {
            Self::NotFound(_) => LoadFailureKind::NotFound,
            Self::ParseError(_) => LoadFailureKind::Parse,
            Self::Fetch { .. } | Self::InvalidLocation(_) => LoadFailureKind::Fetch,
            Self::Timeout { .. } => LoadFailureKind::Timeout,
            Self::Task(_) => LoadFailureKind::Internal,
        }
    }
}
