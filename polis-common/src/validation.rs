//! Configuration validation.
//!
//! Ranges are checked once at load so the scoring stages can rely on them
//! without re-checking per document.

use thiserror::Error;

use crate::config::{
    AnalysisConfig, ClusteringConfig, Config, DimensionConfig, DiversityConfig, PrivacyConfig,
    QualityConfig, RuntimeConfig, TopicConfig, MIN_UNIQUE_USERS_FLOOR, MIN_WINDOW_DAYS_FLOOR,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Privacy minimum {field} lowered to {value} (floor is {floor})")]
    PrivacyFloor {
        field: String,
        value: i64,
        floor: i64,
    },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

fn require_positive(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a positive finite number, got {value}")))
    }
}

fn require_unit(field: &str, value: f64) -> ValidationResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be within [0, 1], got {value}")))
    }
}

fn collect(results: Vec<ValidationResult<()>>) -> ValidationResult<()> {
    let mut errors: Vec<ValidationError> = results.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut results = vec![self.analysis.validate()];

        if !matches!(self.observability.log_format.as_str(), "json" | "pretty") {
            results.push(Err(invalid(
                "observability.log_format",
                "must be \"json\" or \"pretty\"",
            )));
        }

        collect(results)
    }

    /// Load, apply env overrides, and validate configuration.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> ValidationResult<()> {
        collect(vec![
            require_positive("analysis.matching.keyword_weight", self.matching.keyword_weight),
            require_positive("analysis.matching.phrase_weight", self.matching.phrase_weight),
            self.topics.validate(),
            self.dimensions.validate(),
            self.quality.validate(),
            self.privacy.validate(),
            self.diversity.validate(),
            self.clustering.validate(),
            self.runtime.validate(),
        ])
    }
}

impl Validate for TopicConfig {
    fn validate(&self) -> ValidationResult<()> {
        require_positive("analysis.topics.saturation", self.saturation)?;
        require_unit("analysis.topics.min_confidence", self.min_confidence)?;
        if self.max_topics == 0 {
            return Err(invalid("analysis.topics.max_topics", "must be at least 1"));
        }
        Ok(())
    }
}

impl Validate for DimensionConfig {
    fn validate(&self) -> ValidationResult<()> {
        require_positive(
            "analysis.dimensions.confidence_saturation",
            self.confidence_saturation,
        )?;
        require_unit(
            "analysis.dimensions.topic_boost_threshold",
            self.topic_boost_threshold,
        )?;
        if !(self.topic_boost_factor.is_finite() && self.topic_boost_factor >= 0.0) {
            return Err(invalid(
                "analysis.dimensions.topic_boost_factor",
                "must be non-negative",
            ));
        }

        let b = &self.label_boundaries;
        let ascending = b.windows(2).all(|w| w[0] < w[1]);
        let inside = b.iter().all(|v| *v > -1.0 && *v < 1.0);
        if !ascending || !inside {
            return Err(invalid(
                "analysis.dimensions.label_boundaries",
                format!("must be strictly ascending within (-1, 1), got {b:?}"),
            ));
        }
        Ok(())
    }
}

impl Validate for QualityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.min_comments == 0 {
            return Err(invalid("analysis.quality.min_comments", "must be at least 1"));
        }
        if self.full_confidence_comments == 0 {
            return Err(invalid(
                "analysis.quality.full_confidence_comments",
                "must be at least 1",
            ));
        }
        if self.sentiment_timeout_ms == 0 {
            return Err(invalid(
                "analysis.quality.sentiment_timeout_ms",
                "a zero timeout would exclude every call",
            ));
        }
        if self.sentiment_concurrency == 0 {
            return Err(invalid(
                "analysis.quality.sentiment_concurrency",
                "must be at least 1",
            ));
        }
        require_unit("analysis.quality.neutral_band", self.neutral_band)?;
        require_positive(
            "analysis.quality.length_saturation_chars",
            self.length_saturation_chars,
        )?;
        require_positive("analysis.quality.depth_saturation", self.depth_saturation)?;

        let c = &self.constructiveness_weights;
        let w = &self.weights;
        for (field, value) in [
            ("analysis.quality.constructiveness_weights.length", c.length),
            ("analysis.quality.constructiveness_weights.reasoning", c.reasoning),
            ("analysis.quality.constructiveness_weights.questions", c.questions),
            ("analysis.quality.weights.civility", w.civility),
            ("analysis.quality.weights.constructiveness", w.constructiveness),
            ("analysis.quality.weights.viewpoint_diversity", w.viewpoint_diversity),
            ("analysis.quality.weights.engagement", w.engagement),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, "must be non-negative"));
            }
        }
        require_positive(
            "analysis.quality.constructiveness_weights",
            c.length + c.reasoning + c.questions,
        )?;
        let total = w.civility + w.constructiveness + w.viewpoint_diversity + w.engagement;
        if (total - 1.0).abs() > 1e-6 {
            return Err(invalid(
                "analysis.quality.weights",
                format!("must sum to 1.0, got {total}"),
            ));
        }
        Ok(())
    }
}

impl Validate for PrivacyConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.min_unique_users < MIN_UNIQUE_USERS_FLOOR {
            return Err(ValidationError::PrivacyFloor {
                field: "analysis.privacy.min_unique_users".into(),
                value: self.min_unique_users as i64,
                floor: MIN_UNIQUE_USERS_FLOOR as i64,
            });
        }
        if self.min_window_days < MIN_WINDOW_DAYS_FLOOR {
            return Err(ValidationError::PrivacyFloor {
                field: "analysis.privacy.min_window_days".into(),
                value: self.min_window_days,
                floor: MIN_WINDOW_DAYS_FLOOR,
            });
        }
        Ok(())
    }
}

impl Validate for DiversityConfig {
    fn validate(&self) -> ValidationResult<()> {
        require_positive("analysis.diversity.amplification", self.amplification)?;
        if self.min_points < 2 {
            return Err(invalid("analysis.diversity.min_points", "must be at least 2"));
        }
        Ok(())
    }
}

impl Validate for ClusteringConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.min_k < 2 || self.max_k < self.min_k {
            return Err(invalid(
                "analysis.clustering",
                format!(
                    "k range must satisfy 2 <= min_k <= max_k, got {}..={}",
                    self.min_k, self.max_k
                ),
            ));
        }
        if self.max_iterations == 0 {
            return Err(invalid(
                "analysis.clustering.max_iterations",
                "must be at least 1",
            ));
        }
        if self.min_cluster_size == 0 {
            return Err(invalid(
                "analysis.clustering.min_cluster_size",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Validate for RuntimeConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.batch_size == 0 {
            return Err(invalid("analysis.runtime.batch_size", "must be at least 1"));
        }
        if self.max_document_chars == 0 {
            return Err(invalid(
                "analysis.runtime.max_document_chars",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test_case(24, 7 ; "too few users")]
    #[test_case(25, 6 ; "window too short")]
    #[test_case(0, 0 ; "both zero")]
    fn test_privacy_floor_cannot_be_lowered(users: usize, days: i64) {
        let privacy = PrivacyConfig {
            min_unique_users: users,
            min_window_days: days,
        };
        assert!(matches!(
            privacy.validate(),
            Err(ValidationError::PrivacyFloor { .. })
        ));
    }

    #[test]
    fn test_privacy_floor_can_be_raised() {
        let privacy = PrivacyConfig {
            min_unique_users: 100,
            min_window_days: 30,
        };
        assert!(privacy.validate().is_ok());
    }

    #[test_case([-0.6, -0.2, 0.2, 0.6], true ; "default boundaries")]
    #[test_case([-0.2, -0.6, 0.2, 0.6], false ; "unordered")]
    #[test_case([-1.0, -0.2, 0.2, 0.6], false ; "touches the range edge")]
    #[test_case([-0.5, 0.0, 0.0, 0.5], false ; "duplicate boundary")]
    fn test_label_boundaries(boundaries: [f64; 4], ok: bool) {
        let config = DimensionConfig {
            label_boundaries: boundaries,
            ..Default::default()
        };
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn test_k_range_validation() {
        let config = ClusteringConfig {
            min_k: 4,
            max_k: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quality_weights_must_sum_to_one() {
        let mut config = QualityConfig::default();
        config.weights.civility = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let mut config = Config::default();
        config.analysis.runtime.batch_size = 0;
        config.analysis.clustering.max_iterations = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Multiple(errors)) if errors.len() == 2
        ));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = Config::default();
        config.observability.log_format = "xml".into();
        assert!(config.validate().is_err());
    }
}
