//! Core data model shared across the analysis stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use polis_common::{Error, Result};

/// Label used when a dimension saw no lexical evidence at all.
pub const NEUTRAL_LABEL: &str = "Mixed/Neutral";

// ============================================================================
// Dimensions
// ============================================================================

/// One of the three independent political axes.
///
/// Positive scores lean toward the first named pole:
/// - Economic: Market (+) vs Planned (−)
/// - Social: Progressive (+) vs Traditional (−)
/// - Governance: Decentralized (+) vs Centralized (−)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Economic,
    Social,
    Governance,
}

impl Dimension {
    /// All dimensions in canonical order; point coordinates follow this order.
    pub const ALL: [Dimension; 3] = [Dimension::Economic, Dimension::Social, Dimension::Governance];

    /// Coordinate index of this dimension inside a 3-d point.
    pub fn index(self) -> usize {
        match self {
            Dimension::Economic => 0,
            Dimension::Social => 1,
            Dimension::Governance => 2,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Economic => write!(f, "Economic"),
            Self::Social => write!(f, "Social"),
            Self::Governance => write!(f, "Governance"),
        }
    }
}

/// Side of a dimension an indicator or topic pushes toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pole {
    Positive,
    Negative,
}

// ============================================================================
// Per-document results
// ============================================================================

/// A topic detected in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMatch {
    pub topic_id: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// A single keyword or phrase that contributed to a dimension score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub term: String,
    pub pole: Pole,
    pub hits: usize,
    /// Weighted contribution (weight × hits)
    pub contribution: f64,
}

/// Position of one document on one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    /// Signed position in [-1, 1]
    pub score: f64,
    /// Evidence strength in [0, 1]
    pub confidence: f64,
    /// Strongest contributing matches, descending, at most five by default
    pub evidence: Vec<EvidenceItem>,
    pub label: String,
}

impl DimensionScore {
    /// Score for text that carried no evidence on this axis.
    pub fn neutral(dimension: Dimension) -> Self {
        Self {
            dimension,
            score: 0.0,
            confidence: 0.0,
            evidence: Vec::new(),
            label: NEUTRAL_LABEL.to_string(),
        }
    }

    /// `|score| × confidence`, used to pick the dominant dimension.
    pub fn strength(&self) -> f64 {
        self.score.abs() * self.confidence
    }
}

/// Multi-axis result for one document. Never persisted individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticalAnalysisResult {
    pub scores: BTreeMap<Dimension, DimensionScore>,
    /// Top topics, descending by confidence
    pub dominant_topics: Vec<TopicMatch>,
    /// Axis with the largest `|score| × confidence`; `None` when all are zero
    pub dominant_dimension: Option<Dimension>,
    /// Mean confidence across the three dimensions
    pub analysis_quality: f64,
}

impl PoliticalAnalysisResult {
    /// Combine three dimension scores and the detected topics.
    pub fn from_scores(scores: Vec<DimensionScore>, dominant_topics: Vec<TopicMatch>) -> Self {
        let mut by_dimension: BTreeMap<Dimension, DimensionScore> = Dimension::ALL
            .iter()
            .map(|d| (*d, DimensionScore::neutral(*d)))
            .collect();
        for score in scores {
            by_dimension.insert(score.dimension, score);
        }

        let analysis_quality = by_dimension.values().map(|s| s.confidence).sum::<f64>()
            / Dimension::ALL.len() as f64;

        // Strictly greater keeps the earliest dimension on ties
        let mut dominant_dimension = None;
        let mut best = 0.0;
        for dimension in Dimension::ALL {
            let strength = by_dimension[&dimension].strength();
            if strength > best {
                best = strength;
                dominant_dimension = Some(dimension);
            }
        }

        Self {
            scores: by_dimension,
            dominant_topics,
            dominant_dimension,
            analysis_quality,
        }
    }

    /// Zero-confidence, empty-evidence result for a failed or empty document.
    pub fn neutral() -> Self {
        Self::from_scores(Vec::new(), Vec::new())
    }

    /// Score on one dimension.
    pub fn score(&self, dimension: Dimension) -> &DimensionScore {
        // from_scores fills every dimension
        &self.scores[&dimension]
    }

    /// Position as a 3-d point in canonical dimension order.
    pub fn point(&self) -> [f64; 3] {
        let mut point = [0.0; 3];
        for dimension in Dimension::ALL {
            point[dimension.index()] = self.score(dimension).score;
        }
        point
    }

    /// Whether any dimension carried evidence.
    pub fn has_signal(&self) -> bool {
        self.analysis_quality > 0.0
    }
}

// ============================================================================
// Corpus input
// ============================================================================

/// Kind of community document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Post,
    Comment,
}

/// One post or comment supplied by the collection layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_kind")]
    pub kind: DocumentKind,
    /// Parent comment or post, for replies
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Reply depth; 0 for posts and top-level comments
    #[serde(default)]
    pub depth: u32,
}

fn default_kind() -> DocumentKind {
    DocumentKind::Post
}

/// Inclusive time window a profile covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window; `end` must not precede `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::Validation(format!(
                "time window ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole days covered by the window.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether a timestamp falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn score(dimension: Dimension, score: f64, confidence: f64) -> DimensionScore {
        DimensionScore {
            dimension,
            score,
            confidence,
            evidence: Vec::new(),
            label: String::new(),
        }
    }

    #[test]
    fn test_neutral_result_has_no_signal() {
        let result = PoliticalAnalysisResult::neutral();
        assert_eq!(result.scores.len(), 3);
        assert_eq!(result.analysis_quality, 0.0);
        assert_eq!(result.dominant_dimension, None);
        assert_eq!(result.point(), [0.0, 0.0, 0.0]);
        assert!(result
            .scores
            .values()
            .all(|s| s.label == NEUTRAL_LABEL && s.evidence.is_empty()));
    }

    #[test]
    fn test_dominant_dimension_and_quality() {
        let result = PoliticalAnalysisResult::from_scores(
            vec![
                score(Dimension::Economic, 0.5, 0.4),
                score(Dimension::Social, -0.9, 0.5),
                score(Dimension::Governance, 1.0, 0.3),
            ],
            Vec::new(),
        );
        assert_eq!(result.dominant_dimension, Some(Dimension::Social));
        assert!((result.analysis_quality - 0.4).abs() < 1e-12);
        assert_eq!(result.point(), [0.5, -0.9, 1.0]);
    }

    #[test]
    fn test_dominant_dimension_tie_keeps_canonical_order() {
        let result = PoliticalAnalysisResult::from_scores(
            vec![
                score(Dimension::Economic, 0.5, 0.5),
                score(Dimension::Governance, -0.5, 0.5),
            ],
            Vec::new(),
        );
        assert_eq!(result.dominant_dimension, Some(Dimension::Economic));
    }

    #[test]
    fn test_time_window_days() {
        let start = Utc::now();
        let window = TimeWindow::new(start, start + Duration::days(7)).unwrap();
        assert_eq!(window.days(), 7);
        assert!(window.contains(start + Duration::days(3)));
        assert!(TimeWindow::new(start, start - Duration::seconds(1)).is_err());
    }

    #[test]
    fn test_dimension_map_serializes_with_named_keys() {
        let json = serde_json::to_string(&PoliticalAnalysisResult::neutral()).unwrap();
        assert!(json.contains("\"Economic\""));
        assert!(json.contains("\"Governance\""));
    }
}
