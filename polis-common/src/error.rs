//! Error types for the Polis analysis engine.
//!
//! The taxonomy separates faults the caller must see from faults the engine
//! recovers from locally:
//!
//! - [`Error::Validation`] and [`Error::InsufficientData`] surface to the caller.
//! - [`Error::DependencyUnavailable`] and [`Error::Computation`] are produced by
//!   inner stages and absorbed by exclusion or fallback before reaching a
//!   profile boundary.

use thiserror::Error;

/// Result type alias using the Polis error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the analysis engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input shape (mismatched lengths, non-finite values, bad lexicon)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sample size or time window below the ethical minimum
    #[error(
        "Insufficient data: {reason} (unique_users={unique_users}, window_days={window_days})"
    )]
    InsufficientData {
        reason: String,
        unique_users: usize,
        window_days: i64,
    },

    /// Sentiment service down or timed out
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Numerical failure inside a stage (degenerate or singular input)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Run cancelled between map-phase batches
    #[error("Analysis cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build an [`Error::InsufficientData`].
    pub fn insufficient(reason: impl Into<String>, unique_users: usize, window_days: i64) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
            unique_users,
            window_days,
        }
    }

    /// Innermost error, skipping context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is a privacy/ethics gate violation.
    pub fn is_privacy_violation(&self) -> bool {
        matches!(self.root(), Self::InsufficientData { .. })
    }

    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Validation(_))
    }

    /// Check if this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Privacy violations are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Self::DependencyUnavailable(_))
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
