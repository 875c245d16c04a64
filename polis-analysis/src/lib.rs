//! Polis Analysis Library
//!
//! Turns a corpus of community posts and comments into per-document political
//! scores with evidence, and into an aggregate-only community profile.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────── map (worker pool) ───────────────────────────────┐
//! │  text ──► TopicDetector ──► topics ──► DimensionScorers ──► PoliticalAnalysisResult │
//! └──────────────────────────────────────────────────────────────────────────────────┘
//!                                         │
//! ┌──────────────────────────────── reduce (single thread) ──────────────────────────┐
//! │  privacy gate ──► CorpusAggregator ──► DiversityCalculator + ClusterIdentifier    │
//! │                                             │                                     │
//! │                                             ▼                                     │
//! │                                     CommunityProfile                              │
//! └──────────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Dimensions
//! - **Economic**: Market (+) vs Planned (−)
//! - **Social**: Progressive (+) vs Traditional (−)
//! - **Governance**: Decentralized (+) vs Centralized (−)
//!
//! ## Privacy gate
//! A profile needs at least 25 unique users and a 7-day window. The gate is
//! enforced by [`PoliticalAnalysisEngine`]; the aggregation stage is not
//! reachable from outside the crate.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod dimensions;
pub mod engine;
pub mod lexicon;
pub mod profile;
pub mod quality;
pub mod sentiment;
pub mod topics;
pub mod types;

pub use dimensions::{DimensionScorer, DimensionScorers};
pub use engine::{PoliticalAnalysisEngine, ProfileRequest};
pub use lexicon::{DimensionLexicons, IndicatorSet, TopicDefinition, TopicTaxonomy};
pub use profile::{
    calculate_political_diversity, identify_political_clusters, silhouette_score, Cluster,
    ClusterIdentifier, CommunityProfile, DimensionDistribution, DiversityCalculator,
    ProfileComparison, SampleSize,
};
pub use quality::{Comment, DiscussionQualityResult, DiscussionQualityScorer, QualityStatus};
pub use sentiment::{LexiconSentiment, SentimentService, SentimentSignal};
pub use topics::TopicDetector;
pub use types::{
    Dimension, DimensionScore, Document, DocumentKind, EvidenceItem, PoliticalAnalysisResult,
    Pole, TimeWindow, TopicMatch,
};
