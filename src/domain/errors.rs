//! Domain error types
//!
//! The error hierarchy for Tally. All errors are domain-specific and don't
//! expose third-party types; adapters map their library errors into these
//! variants at the boundary.

use thiserror::Error;

/// Main Tally error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Configuration-related errors (missing or invalid settings).
    /// Raised before any network call is attempted.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Usage extraction failed. Never retried: a failed read has no side
    /// effect to undo, the next scheduled cycle simply runs again.
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Settings row persistence errors (marker read/advance)
    #[error("Settings store error: {0}")]
    Settings(String),

    /// Sink upload protocol errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Sink-specific errors
///
/// Errors raised while talking to the analytics sink's control API or the
/// object store. The transient/permanent split drives the retry policy:
/// only `Transient`, `Network`, and `Timeout` are ever retried, and only
/// on the signed-URL step.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Server-side failure (5xx), retried with backoff
    #[error("Sink server error: {status} - {message}")]
    Transient { status: u16, message: String },

    /// Client-side rejection (4xx) or a fatal step failure, never retried
    #[error("Sink request rejected: {status} - {message}")]
    Permanent { status: u16, message: String },

    /// Well-formed success response missing a required field, never retried
    #[error("Sink protocol error: {0}")]
    Protocol(String),

    /// Connection-level failure, retried with backoff
    #[error("Sink connection error: {0}")]
    Network(String),

    /// Request timeout, retried with backoff
    #[error("Sink request timeout: {0}")]
    Timeout(String),
}

impl SinkError {
    /// Whether the retry loop may attempt this request again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SinkError::Transient { .. } | SinkError::Network(_) | SinkError::Timeout(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for TallyError {
    fn from(err: std::io::Error) -> Self {
        TallyError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        TallyError::Serialization(err.to_string())
    }
}

// Conversion from csv writer errors
impl From<csv::Error> for TallyError {
    fn from(err: csv::Error) -> Self {
        TallyError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TallyError {
    fn from(err: toml::de::Error) -> Self {
        TallyError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_error_display() {
        let err = TallyError::Configuration("missing sink.api_key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing sink.api_key");
    }

    #[test]
    fn test_sink_error_conversion() {
        let sink_err = SinkError::Transient {
            status: 503,
            message: "unavailable".to_string(),
        };
        let err: TallyError = sink_err.into();
        assert!(matches!(err, TallyError::Sink(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SinkError::Transient {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(SinkError::Network("reset".to_string()).is_retryable());
        assert!(SinkError::Timeout("30s".to_string()).is_retryable());
        assert!(!SinkError::Permanent {
            status: 401,
            message: String::new()
        }
        .is_retryable());
        assert!(!SinkError::Protocol("missing 'url'".to_string()).is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TallyError = io_err.into();
        assert!(matches!(err, TallyError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: TallyError = json_err.into();
        assert!(matches!(err, TallyError::Serialization(_)));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = TallyError::DataAccess("query failed".to_string());
        let _: &dyn std::error::Error = &err;
        let sink = SinkError::Protocol("missing Location header".to_string());
        let _: &dyn std::error::Error = &sink;
    }
}
