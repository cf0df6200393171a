//! Completion backend errors and retry classification.

/// Completion backend error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ModelsErrorKind {
    /// API key missing from the environment
    #[display("{} environment variable not set", _0)]
    MissingApiKey(String),
    /// Transport-level failure (connection refused, TLS, reset)
    #[display("HTTP error: {}", _0)]
    Http(String),
    /// The API answered with a non-success status
    #[display("API error (status {}): {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// The request could not be expressed in the backend's format
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// The response body did not match the backend's format
    #[display("Response parsing failed: {}", _0)]
    ResponseParsing(String),
    /// The call did not complete within the configured timeout
    #[display("Completion call timed out after {}s", _0)]
    Timeout(u64),
}

impl ModelsErrorKind {
    /// Check if this error type should be retried.
    ///
    /// Transport failures, timeouts, rate limits and server errors are
    /// transient; malformed requests and missing credentials are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelsErrorKind::Api { status, .. } => {
                matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            ModelsErrorKind::Http(_) => true,
            ModelsErrorKind::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Completion backend error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Models Error: {} at {}:{}", kind, file, line)]
pub struct ModelsError {
    /// The specific error kind
    pub kind: ModelsErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// Source file where error occurred
    pub file: &'static str,
}

impl ModelsError {
    /// Create a new models error.
    #[track_caller]
    pub fn new(kind: ModelsErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Result type for model operations.
pub type ModelsResult<T> = Result<T, ModelsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            let kind = ModelsErrorKind::Api {
                status,
                message: String::new(),
            };
            assert!(kind.is_retryable(), "status {} should retry", status);
        }

        let kind = ModelsErrorKind::Api {
            status: 401,
            message: "bad key".to_string(),
        };
        assert!(!kind.is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert!(ModelsErrorKind::Timeout(30).is_retryable());
        assert!(!ModelsErrorKind::MissingApiKey("OPENAI_API_KEY".to_string()).is_retryable());
    }
}
