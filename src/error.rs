//! Error types for the checker
//!
//! Probe failures are kept out of this enum. They are contained in
//! [`crate::prober::ProbeError`] and never cross the prober boundary.

/// Broad category of a [`CheckerError`], used by callers and tests to branch
/// on what went wrong without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Network,
    Persistence,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("Please configure M3U8 URL in plugin settings first")]
    MissingUrl,

    #[error("Invalid URL format: {0}. URL must start with http:// or https://")]
    InvalidUrl(String),

    #[error("Invalid timeout: {0}. Timeout must be a whole number of seconds")]
    InvalidTimeout(String),

    #[error("No channels found in selected groups: {}.\n\nAvailable groups: {}\n\nPlease check your group names and try again.", .selected.join(", "), .available.join(", "))]
    NoMatchingGroups {
        selected: Vec<String>,
        available: Vec<String>,
    },

    #[error("{0}")]
    Network(String),

    #[error("No results available. Run 'Check Streams' first.")]
    NoResults,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckerError::MissingUrl
            | CheckerError::InvalidUrl(_)
            | CheckerError::InvalidTimeout(_)
            | CheckerError::NoMatchingGroups { .. } => ErrorKind::Configuration,
            CheckerError::Network(_) => ErrorKind::Network,
            CheckerError::NoResults => ErrorKind::Persistence,
            CheckerError::Io(_) | CheckerError::Json(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckerError>;
