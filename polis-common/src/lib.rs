//! Polis Common - Shared types and utilities for the Polis analysis engine.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - The engine's error taxonomy
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    AggregationConfig, AnalysisConfig, ClusteringConfig, Config, DimensionConfig,
    DiversityConfig, LexiconPaths, MatchingConfig, ObservabilityConfig, PrivacyConfig,
    QualityConfig, RuntimeConfig, TopicConfig,
};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{AnalysisConfig, Config};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
    pub use crate::validation::{Validate, ValidationError};
}
