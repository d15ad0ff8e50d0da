//! Unified error types for Ward

use thiserror::Error;

/// Unified error type for all Ward operations
#[derive(Error, Debug)]
pub enum WardError {
    // Configuration errors
    #[error("Required environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Environment variable {name} is invalid: {reason}")]
    InvalidEnv { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Fixture-lookup errors
    #[error("No {kind} found with {key}")]
    FixtureNotFound { kind: String, key: String },

    // Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    // Browser / UI interaction errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Target page, context or browser has been closed")]
    PageClosed,

    // Instrumentation errors
    #[error("Report error: {0}")]
    Report(String),

    // Suite runner errors
    #[error("Suite error: {0}")]
    Suite(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl WardError {
    /// Lookup miss for a fixture record, e.g. `not_found("user", "role: admin")`
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::FixtureNotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// True when the error was caused by the page, context or browser going away
    pub fn is_page_closed(&self) -> bool {
        match self {
            Self::PageClosed => true,
            Self::Browser(msg) => msg.contains("has been closed"),
            _ => false,
        }
    }
}

/// Result type alias using WardError
pub type Result<T> = std::result::Result<T, WardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_key() {
        let err = WardError::not_found("user", "role: admin");
        assert_eq!(err.to_string(), "No user found with role: admin");
    }

    #[test]
    fn test_page_closed_detection() {
        assert!(WardError::PageClosed.is_page_closed());
        assert!(WardError::Browser("Target page has been closed".into()).is_page_closed());
        assert!(!WardError::Timeout("#login".into()).is_page_closed());
        assert!(!WardError::Browser("connection closed before message completed".into()).is_page_closed());
    }
}
