//! Error types for leadsync
//!
//! One taxonomy covers the whole engine. Whether an error is fatal depends on
//! where it is raised: a failure while draining a whole collection aborts the
//! run, the same failure while handling a single list is folded into the
//! run report.

use thiserror::Error;

/// Maximum number of characters of an upstream response body kept in errors
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Result type alias for leadsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for leadsync
#[derive(Error, Debug)]
pub enum SyncError {
    /// A collection endpoint answered with a non-success status
    #[error("{collection} API error: {status} - {body}")]
    FetchFailure {
        collection: String,
        status: u16,
        body: String,
    },

    /// A response did not match any recognized envelope
    #[error("Unexpected {collection} response format: {detail}")]
    SchemaMismatch { collection: String, detail: String },

    /// A source unit or request failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A destination write call answered with a non-success status
    #[error("Destination write failed for campaign {entity_id} (chunk {chunk}): {status} - {body}")]
    WriteFailure {
        entity_id: String,
        chunk: usize,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The idempotency store failed
    #[error("Idempotency store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a fetch failure, truncating the upstream body
    pub fn fetch_failure(collection: impl Into<String>, status: u16, body: &str) -> Self {
        Self::FetchFailure {
            collection: collection.into(),
            status,
            body: truncate_body(body),
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(collection: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            collection: collection.into(),
            detail: detail.into(),
        }
    }

    /// Create a write failure, truncating the upstream body
    pub fn write_failure(entity_id: impl Into<String>, chunk: usize, status: u16, body: &str) -> Self {
        Self::WriteFailure {
            entity_id: entity_id.into(),
            chunk,
            status,
            body: truncate_body(body),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors raised while talking to an upstream collection endpoint
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::FetchFailure { .. } | Self::SchemaMismatch { .. } | Self::Network(_)
        )
    }
}

/// Cut an upstream response body down to [`MAX_ERROR_BODY_CHARS`] characters
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn test_truncate_body_cuts_on_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY_CHARS + 20);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn test_fetch_failure_message() {
        let err = SyncError::fetch_failure("Amplemarket", 401, "unauthorized");
        assert_eq!(err.to_string(), "Amplemarket API error: 401 - unauthorized");
        assert!(err.is_upstream());
    }

    #[test]
    fn test_write_failure_is_not_upstream_fetch() {
        let err = SyncError::write_failure("9", 2, 429, "slow down");
        assert!(!err.is_upstream());
        assert!(err.to_string().contains("chunk 2"));
    }
}
