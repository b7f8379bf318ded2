//! Error types for partition lifecycle and selection.

use thiserror::Error;

/// Result type used throughout Kairos.
pub type Result<T> = std::result::Result<T, KairosError>;

/// Errors raised while resolving or managing partitions.
///
/// Every error is scoped to the operation that raised it. Nothing here is
/// fatal to the process. The only internal retry is a single one after an
/// engine 404 on a partition alias taken from a stale cache snapshot.
#[derive(Debug, Error)]
pub enum KairosError {
    /// A malformed argument such as an unparseable date.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Client input that can never succeed as sent, e.g. an item without a datetime.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The engine reported that an index with this name already exists.
    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),

    /// A failure reported by, or while talking to, the search engine.
    #[error("search engine error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Engine {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl KairosError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        KairosError::InvalidArgument(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        KairosError::BadRequest(msg.into())
    }

    pub fn already_exists(index: impl Into<String>) -> Self {
        KairosError::IndexAlreadyExists(index.into())
    }

    /// An engine failure without an HTTP status (connection refused, malformed response).
    pub fn engine(msg: impl Into<String>) -> Self {
        KairosError::Engine {
            status: None,
            message: msg.into(),
        }
    }

    pub fn engine_status(status: u16, msg: impl Into<String>) -> Self {
        KairosError::Engine {
            status: Some(status),
            message: msg.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        KairosError::InvalidConfig(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        KairosError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        KairosError::Internal(msg.into())
    }

    /// True for the benign "index already exists" conflict on create.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, KairosError::IndexAlreadyExists(_))
    }

    /// True when the engine answered 404 for an index or alias.
    pub fn is_engine_not_found(&self) -> bool {
        matches!(self, KairosError::Engine { status: Some(404), .. })
    }

    /// True when retrying the same request cannot help.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KairosError::InvalidArgument(_) | KairosError::BadRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = KairosError::engine_status(503, "cluster unavailable");
        assert_eq!(
            err.to_string(),
            "search engine error (status 503): cluster unavailable"
        );

        let err = KairosError::engine("connection reset");
        assert_eq!(err.to_string(), "search engine error: connection reset");
    }

    #[test]
    fn test_classification() {
        assert!(KairosError::already_exists("items_a").is_already_exists());
        assert!(!KairosError::engine("boom").is_already_exists());

        assert!(KairosError::bad_request("no datetime").is_client_error());
        assert!(KairosError::invalid_argument("bad date").is_client_error());
        assert!(!KairosError::engine("timeout").is_client_error());

        assert!(KairosError::engine_status(404, "no such index [c1_2024-01-01]").is_engine_not_found());
        assert!(!KairosError::engine_status(503, "unavailable").is_engine_not_found());
        assert!(!KairosError::not_found("c1_2024-01-01").is_engine_not_found());
    }
}
