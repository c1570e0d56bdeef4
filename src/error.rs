use thiserror::Error;

/// Main error type for everything that talks to the catalog.
///
/// Business rejections (a declined payment, a refused renewal) are not errors:
/// they travel inside the returned records. Only transport exhaustion, caller
/// contract violations and local failures end up here.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unable to contact catalog ({url}) after {attempts} attempts, please try again later")]
    Unreachable { url: String, attempts: u32 },

    #[error("Patron not found: {identifier}")]
    PatronNotFound { identifier: String },

    #[error("Caller contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid markup pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Preconditions the caller must satisfy before a workflow may run.
///
/// These are programming errors. They are reported before any network I/O
/// and must never be retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("no catalog host configured")]
    NoHost,

    #[error("patron attributes not yet loaded")]
    PatronNotLoaded,

    #[error("PIN not yet set")]
    MissingPin,

    #[error("session already closed")]
    SessionClosed,

    #[error("no {what} given")]
    EmptySelection { what: &'static str },
}

impl ScrapeError {
    /// True when the catalog could not be reached within the retry budget.
    ///
    /// Callers should surface this as "catalog temporarily unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ScrapeError::Unreachable { .. })
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ScrapeError::Contract(_))
    }
}

impl From<crate::config::ConfigError> for ScrapeError {
    fn from(err: crate::config::ConfigError) -> Self {
        ScrapeError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ScrapeError>;
