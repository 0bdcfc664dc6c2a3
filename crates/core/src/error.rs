//! Error types for the Storyloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// Failures reported by (or while talking to) the text generation collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Request rejected: {0}")]
    BusinessRule(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Could not interpret response: {0}")]
    Parse(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, timeouts, rate limits, 408 and 5xx responses are
    /// transient. Everything else (4xx, validation, business rules, auth,
    /// unparseable payloads) fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Api { status_code, .. } => {
                matches!(status_code, 408 | 429) || (500..=599).contains(status_code)
            }
            Self::Validation(_)
            | Self::BusinessRule(_)
            | Self::Authentication(_)
            | Self::Parse(_)
            | Self::NotConfigured(_) => false,
        }
    }
}

/// Failures while reading project state from the backing store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt project record {project_id}: {reason}")]
    Corrupt { project_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_displays_correctly() {
        let err = GenerationError::Api {
            status_code: 503,
            message: "Service Unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(GenerationError::Network("conn reset".into()).is_retryable());
        assert!(GenerationError::Timeout("30s".into()).is_retryable());
        assert!(GenerationError::RateLimited { retry_after_secs: 5 }.is_retryable());
        for status_code in [408, 429, 500, 502, 503, 599] {
            let err = GenerationError::Api {
                status_code,
                message: String::new(),
            };
            assert!(err.is_retryable(), "{status_code} should be retryable");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for status_code in [400, 401, 403, 404, 422] {
            let err = GenerationError::Api {
                status_code,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "{status_code} should not be retryable");
        }
        assert!(!GenerationError::Validation("empty prompt".into()).is_retryable());
        assert!(!GenerationError::BusinessRule("quota".into()).is_retryable());
        assert!(!GenerationError::Authentication("bad key".into()).is_retryable());
        assert!(!GenerationError::Parse("not json".into()).is_retryable());
    }

    #[test]
    fn repository_error_displays_project() {
        let err = RepositoryError::Corrupt {
            project_id: "p-1".into(),
            reason: "missing title".into(),
        };
        assert!(err.to_string().contains("p-1"));
        assert!(err.to_string().contains("missing title"));
    }
}
