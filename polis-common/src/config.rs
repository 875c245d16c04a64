//! Configuration management for the Polis engine.
//!
//! The engine reads a single configuration file at `~/.polis/config.json`.
//! Every numeric constant the scoring stages use is a named field here so
//! deployments can override it without a rebuild.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (POLIS_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `POLIS_LOG_LEVEL` → observability.log_level
//! - `POLIS_LOG_FORMAT` → observability.log_format
//! - `POLIS_PARALLELISM` → analysis.runtime.parallelism
//! - `POLIS_CLUSTER_SEED` → analysis.clustering.seed
//! - `POLIS_TAXONOMY_PATH` → lexicons.taxonomy_path
//! - `POLIS_LEXICON_PATH` → lexicons.lexicon_path

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest unique-user count a profile may ever be built from.
pub const MIN_UNIQUE_USERS_FLOOR: usize = 25;

/// Shortest time window, in days, a profile may ever cover.
pub const MIN_WINDOW_DAYS_FLOOR: i64 = 7;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".polis"),
        |dirs| dirs.home_dir().join(".polis"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Scoring, aggregation and clustering parameters
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Optional replacement lexicon files
    #[serde(default)]
    pub lexicons: LexiconPaths,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("POLIS_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("POLIS_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Ok(parallelism) = std::env::var("POLIS_PARALLELISM") {
            if let Ok(p) = parallelism.parse() {
                self.analysis.runtime.parallelism = p;
            }
        }
        if let Ok(seed) = std::env::var("POLIS_CLUSTER_SEED") {
            if let Ok(s) = seed.parse() {
                self.analysis.clustering.seed = s;
            }
        }
        if let Ok(path) = std::env::var("POLIS_TAXONOMY_PATH") {
            self.lexicons.taxonomy_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("POLIS_LEXICON_PATH") {
            self.lexicons.lexicon_path = Some(PathBuf::from(path));
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let path = config_path();
        let dir = config_dir();

        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Paths to JSON files replacing the built-in taxonomy or dimension lexicon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconPaths {
    #[serde(default)]
    pub taxonomy_path: Option<PathBuf>,
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,
}

// ============================================================================
// Analysis
// ============================================================================

/// Parameters for every engine stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub dimensions: DimensionConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub diversity: DiversityConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Weights for individual lexical hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Contribution of one single-word keyword hit
    pub keyword_weight: f64,
    /// Contribution of one multi-word phrase hit
    pub phrase_weight: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 1.0,
            phrase_weight: 2.0,
        }
    }
}

/// Topic detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Weighted hit total at which a topic reaches confidence 1.0
    pub saturation: f64,
    /// Topics below this confidence are dropped
    pub min_confidence: f64,
    /// Maximum topics reported per document
    pub max_topics: usize,
    /// Texts shorter than this (in characters, after trimming) yield no topics
    pub min_text_chars: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            saturation: 6.0,
            min_confidence: 0.15,
            max_topics: 5,
            min_text_chars: 20,
        }
    }
}

/// Dimension scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    /// Weighted hit total at which confidence saturates at 1.0
    pub confidence_saturation: f64,
    /// Aligned topics must exceed this confidence to boost a pole
    pub topic_boost_threshold: f64,
    /// Multiplier applied to an aligned topic's confidence
    pub topic_boost_factor: f64,
    /// Ascending inner boundaries splitting [-1, 1] into five label buckets
    pub label_boundaries: [f64; 4],
    /// Maximum evidence items kept per dimension
    pub max_evidence: usize,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            confidence_saturation: 10.0,
            topic_boost_threshold: 0.3,
            topic_boost_factor: 0.5,
            label_boundaries: [-0.6, -0.2, 0.2, 0.6],
            max_evidence: 5,
        }
    }
}

/// Discussion quality parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Fewer comments than this yields an undetermined result
    pub min_comments: usize,
    /// Comment count at which confidence reaches 1.0
    pub full_confidence_comments: usize,
    /// Per-call timeout for the sentiment collaborator
    pub sentiment_timeout_ms: u64,
    /// Sentiment calls in flight at once
    pub sentiment_concurrency: usize,
    /// Sentiment scores within ±band count as neutral
    pub neutral_band: f64,
    /// Average comment length (characters) that earns the full length credit
    pub length_saturation_chars: f64,
    /// Questions need at least this many words to count as substantive
    pub substantive_question_min_words: usize,
    /// Mean reply depth that earns the full depth credit
    pub depth_saturation: f64,
    /// Words that mark a comment as offering reasoning
    pub reasoning_connectors: Vec<String>,
    /// Weights of the constructiveness components
    pub constructiveness_weights: ConstructivenessWeights,
    /// Weights of the overall score
    pub weights: QualityWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_comments: 5,
            full_confidence_comments: 50,
            sentiment_timeout_ms: 2_000,
            sentiment_concurrency: 8,
            neutral_band: 0.1,
            length_saturation_chars: 400.0,
            substantive_question_min_words: 6,
            depth_saturation: 4.0,
            reasoning_connectors: ["because", "therefore", "however", "evidence"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            constructiveness_weights: ConstructivenessWeights::default(),
            weights: QualityWeights::default(),
        }
    }
}

/// Component weights for constructiveness; normalized at use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructivenessWeights {
    pub length: f64,
    pub reasoning: f64,
    pub questions: f64,
}

impl Default for ConstructivenessWeights {
    fn default() -> Self {
        Self {
            length: 0.4,
            reasoning: 0.4,
            questions: 0.2,
        }
    }
}

/// Weights of the overall discussion quality score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub civility: f64,
    pub constructiveness: f64,
    pub viewpoint_diversity: f64,
    pub engagement: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            civility: 0.3,
            constructiveness: 0.3,
            viewpoint_diversity: 0.2,
            engagement: 0.2,
        }
    }
}

/// Ethical minimums for building a community profile.
///
/// Both values may be raised above the floors but never lowered below them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    pub min_unique_users: usize,
    pub min_window_days: i64,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            min_unique_users: MIN_UNIQUE_USERS_FLOOR,
            min_window_days: MIN_WINDOW_DAYS_FLOOR,
        }
    }
}

/// Corpus aggregation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Document count at which profile confidence is no longer scaled down
    pub full_confidence_documents: usize,
    /// Topics listed in a profile's topic roll-up
    pub max_profile_topics: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            full_confidence_documents: 100,
            max_profile_topics: 5,
        }
    }
}

/// Diversity index parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    /// Fewer points than this yields a diversity of 0.0
    pub min_points: usize,
    /// Multiplier applied to the mean normalized distance before clipping
    pub amplification: f64,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            min_points: 10,
            amplification: 1.5,
        }
    }
}

/// Cluster identification parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub min_k: usize,
    pub max_k: usize,
    /// Seed for centroid initialization; identical input and seed give identical clusters
    pub seed: u64,
    pub max_iterations: usize,
    /// Clusters smaller than this are merged into their nearest larger neighbour
    pub min_cluster_size: usize,
    /// Fewer points than this yields a single cluster
    pub min_points: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_k: 2,
            max_k: 6,
            seed: 42,
            max_iterations: 100,
            min_cluster_size: 10,
            min_points: 10,
        }
    }
}

/// Map-phase execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for the map phase; 0 uses one per CPU
    pub parallelism: usize,
    /// Documents per map batch; cancellation is checked between batches
    pub batch_size: usize,
    /// Longer documents are rejected and scored as neutral
    pub max_document_chars: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            parallelism: 0,
            batch_size: 256,
            max_document_chars: 40_000,
        }
    }
}
