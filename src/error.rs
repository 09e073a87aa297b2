use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Infrastructure and collaborator errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("store error: {0}")]
    Store(String),

    /// A freshly generated session id already existed.
    #[error("session id collision")]
    SessionCollision,

    #[error("quote provider error: {0}")]
    Quote(String),

    #[error("executor error: {0}")]
    Execution(String),

    #[error("balance source error: {0}")]
    BalanceFetch(String),

    #[error("wallet directory error: {0}")]
    Wallet(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

/// Caller-facing failures of the confirmation pipeline.
///
/// The `Display` text is for logs. Callers rendering a message to a user
/// should use [`PipelineError::user_message`], which never echoes
/// collaborator or lock internals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The session is absent, expired, or already used. These cases are
    /// deliberately indistinguishable.
    #[error("confirmation not found or expired")]
    NotFoundOrExpired,

    /// The price moved beyond tolerance after the reconfirm cap was reached.
    #[error("reconfirm limit exceeded")]
    ReconfirmLimitExceeded,

    /// Another balance-mutating operation holds the subject's lock.
    #[error("operation already in progress")]
    OperationInProgress,

    #[error("quote fetch failed: {0}")]
    QuoteFetchFailed(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// A backing store failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl PipelineError {
    /// Stable, generic message for the category.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NotFoundOrExpired => "This confirmation has expired or was already used.",
            Self::ReconfirmLimitExceeded => "Price moved too much, please start over.",
            Self::OperationInProgress => {
                "Another operation is already in progress. Please wait and try again."
            }
            Self::QuoteFetchFailed(_) => "Could not fetch a price quote. Please try again.",
            Self::ExecutionFailed(_) => "The transaction could not be completed.",
            Self::RateLimited => "Too many requests. Please slow down.",
            Self::InvalidRequest(_) => "The request is invalid.",
            Self::Unavailable(_) => "Service temporarily unavailable. Please try again.",
        }
    }

    /// Stable category name for events and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFoundOrExpired => "not_found_or_expired",
            Self::ReconfirmLimitExceeded => "reconfirm_limit_exceeded",
            Self::OperationInProgress => "operation_in_progress",
            Self::QuoteFetchFailed(_) => "quote_fetch_failed",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<Error> for PipelineError {
    fn from(err: Error) -> Self {
        match err {
            Error::Domain(e) => Self::InvalidRequest(e),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_do_not_echo_details() {
        let err = PipelineError::ExecutionFailed("rpc node 10.0.0.3 refused".into());
        assert!(!err.user_message().contains("10.0.0.3"));
        assert!(err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn store_errors_become_unavailable() {
        let err: PipelineError = Error::Database("disk I/O error".into()).into();
        assert_eq!(err.code(), "unavailable");
    }

    #[test]
    fn domain_errors_become_invalid_request() {
        let err: PipelineError = Error::Domain(DomainError::EmptyAsset).into();
        assert_eq!(err, PipelineError::InvalidRequest(DomainError::EmptyAsset));
    }
}
