//! Dimension scoring.
//!
//! Every axis is scored the same way from its lexicon:
//!
//! ```text
//! raw_pos = Σ hits(positive terms) × weight + Σ aligned topic boosts
//! raw_neg = Σ hits(negative terms) × weight + Σ aligned topic boosts
//! score   = (raw_pos − raw_neg) / (raw_pos + raw_neg)
//! conf    = min((raw_pos + raw_neg) / saturation, 1)
//! ```
//!
//! A topic boosts its aligned pole by `confidence × factor` once its
//! confidence exceeds the boost threshold.

pub mod labels;

use std::cmp::Ordering;
use std::sync::Arc;

use polis_common::config::{DimensionConfig, MatchingConfig};

use crate::lexicon::{DimensionLexicon, DimensionLexicons};
use crate::types::{Dimension, DimensionScore, EvidenceItem, Pole, TopicMatch};

pub use labels::{bucket_index, composite_label, label_for, HISTOGRAM_BOUNDARIES};

/// Scores text on one political axis.
#[derive(Debug, Clone)]
pub struct DimensionScorer {
    lexicon: Arc<DimensionLexicon>,
    matching: MatchingConfig,
    config: DimensionConfig,
}

impl DimensionScorer {
    pub fn new(
        lexicon: Arc<DimensionLexicon>,
        matching: MatchingConfig,
        config: DimensionConfig,
    ) -> Self {
        Self {
            lexicon,
            matching,
            config,
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.lexicon.dimension()
    }

    /// Score `text` given the topics already detected in it.
    pub fn analyze(&self, text: &str, topics: &[TopicMatch]) -> DimensionScore {
        let dimension = self.dimension();
        let mut raw_pos = 0.0;
        let mut raw_neg = 0.0;
        let mut evidence = Vec::new();

        if !text.trim().is_empty() {
            for pole in [Pole::Positive, Pole::Negative] {
                for hit in self.lexicon.pole(pole).hits(text) {
                    let contribution = hit.contribution(&self.matching);
                    match pole {
                        Pole::Positive => raw_pos += contribution,
                        Pole::Negative => raw_neg += contribution,
                    }
                    evidence.push(EvidenceItem {
                        term: hit.term.to_string(),
                        pole,
                        hits: hit.count,
                        contribution,
                    });
                }
            }

            for topic in topics {
                if topic.confidence <= self.config.topic_boost_threshold {
                    continue;
                }
                let boost = topic.confidence * self.config.topic_boost_factor;
                match self.lexicon.alignment(&topic.topic_id) {
                    Some(Pole::Positive) => raw_pos += boost,
                    Some(Pole::Negative) => raw_neg += boost,
                    None => {}
                }
            }
        }

        let total = raw_pos + raw_neg;
        if total <= 0.0 {
            return DimensionScore::neutral(dimension);
        }

        let score = ((raw_pos - raw_neg) / total).clamp(-1.0, 1.0);
        let confidence = (total / self.config.confidence_saturation).min(1.0);

        evidence.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.term.cmp(&b.term))
        });
        evidence.truncate(self.config.max_evidence);

        DimensionScore {
            dimension,
            score,
            confidence,
            evidence,
            label: label_for(dimension, score, &self.config.label_boundaries).to_string(),
        }
    }
}

/// The three axis scorers, in canonical dimension order.
#[derive(Debug, Clone)]
pub struct DimensionScorers {
    scorers: [DimensionScorer; 3],
}

impl DimensionScorers {
    pub fn new(
        lexicons: &DimensionLexicons,
        matching: &MatchingConfig,
        config: &DimensionConfig,
    ) -> Self {
        let build = |d: Dimension| {
            DimensionScorer::new(
                Arc::new(lexicons.get(d).clone()),
                matching.clone(),
                config.clone(),
            )
        };
        Self {
            scorers: [
                build(Dimension::Economic),
                build(Dimension::Social),
                build(Dimension::Governance),
            ],
        }
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionScorer {
        &self.scorers[dimension.index()]
    }

    /// Score all three axes.
    pub fn analyze_all(&self, text: &str, topics: &[TopicMatch]) -> Vec<DimensionScore> {
        self.scorers.iter().map(|s| s.analyze(text, topics)).collect()
    }
}
