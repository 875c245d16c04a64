//! Topic detection.
//!
//! A topic's confidence is its weighted hit total (keywords × 1, phrases × 2)
//! divided by a saturation constant and clipped to [0, 1]. Topics below the
//! minimum confidence are dropped and the rest are ranked.

use std::cmp::Ordering;
use std::sync::Arc;

use polis_common::config::{MatchingConfig, TopicConfig};

use crate::lexicon::TopicTaxonomy;
use crate::types::TopicMatch;

/// Detects political topics in text using a shared taxonomy.
#[derive(Debug, Clone)]
pub struct TopicDetector {
    taxonomy: Arc<TopicTaxonomy>,
    matching: MatchingConfig,
    config: TopicConfig,
}

impl TopicDetector {
    pub fn new(
        taxonomy: Arc<TopicTaxonomy>,
        matching: MatchingConfig,
        config: TopicConfig,
    ) -> Self {
        Self {
            taxonomy,
            matching,
            config,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(taxonomy: Arc<TopicTaxonomy>) -> Self {
        Self::new(taxonomy, MatchingConfig::default(), TopicConfig::default())
    }

    pub fn taxonomy(&self) -> &TopicTaxonomy {
        &self.taxonomy
    }

    /// Detect topics, descending by confidence with ties broken by topic id.
    ///
    /// Empty text and text shorter than the minimum length yield no topics.
    pub fn detect_topics(&self, text: &str) -> Vec<TopicMatch> {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.config.min_text_chars {
            return Vec::new();
        }

        let mut matches: Vec<TopicMatch> = self
            .taxonomy
            .compiled()
            .iter()
            .filter_map(|topic| {
                let raw = topic.matcher.weighted_total(trimmed, &self.matching);
                let confidence = (raw / self.config.saturation).clamp(0.0, 1.0);
                (confidence >= self.config.min_confidence).then(|| TopicMatch {
                    topic_id: topic.definition.id.clone(),
                    confidence,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        matches.truncate(self.config.max_topics);
        matches
    }
}

/// Confidence of a topic within a match list; 0.0 when absent.
pub fn topic_confidence(matches: &[TopicMatch], topic_id: &str) -> f64 {
    matches
        .iter()
        .find(|m| m.topic_id == topic_id)
        .map_or(0.0, |m| m.confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::TopicDefinition;

    fn detector() -> TopicDetector {
        TopicDetector::with_defaults(Arc::new(TopicTaxonomy::builtin().unwrap()))
    }

    #[test]
    fn test_empty_and_short_text_yield_nothing() {
        let d = detector();
        assert!(d.detect_topics("").is_empty());
        assert!(d.detect_topics("   ").is_empty());
        assert!(d.detect_topics("taxes! guns!").is_empty());
    }

    #[test]
    fn test_confidence_is_normalized_hit_weight() {
        let taxonomy = TopicTaxonomy::new(vec![TopicDefinition::new(
            "parks",
            &["park", "trees"],
            &["green space"],
        )])
        .unwrap();
        let d = TopicDetector::with_defaults(Arc::new(taxonomy));

        // 1 keyword = 1/6
        let one = d.detect_topics("We walked through the park at noon today.");
        assert_eq!(one.len(), 1);
        assert!((one[0].confidence - 1.0 / 6.0).abs() < 1e-12);

        // park + trees + green space = 4/6
        let four = d.detect_topics("The park needs more trees and more green space for kids.");
        assert!((four[0].confidence - 4.0 / 6.0).abs() < 1e-12);

        // saturates at 1.0
        let many = d.detect_topics("park park park park green space green space trees");
        assert_eq!(many[0].confidence, 1.0);
    }

    #[test]
    fn test_results_ranked_and_capped() {
        let d = detector();
        let text = "Healthcare and single payer, the minimum wage and unions, gun control and \
                    background checks, climate change and emissions, immigration and asylum, \
                    student loans and tuition, police and prison reform.";
        let topics = d.detect_topics(text);
        assert!(topics.len() <= 5);
        assert!(topics.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(topics.iter().all(|t| t.confidence >= 0.15 && t.confidence <= 1.0));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let d = detector();
        let text = "Tax cuts for small business owners will grow the economy and jobs.";
        assert_eq!(d.detect_topics(text), d.detect_topics(text));
        assert!(topic_confidence(&d.detect_topics(text), "taxation") > 0.0);
        assert_eq!(topic_confidence(&d.detect_topics(text), "guns"), 0.0);
    }
}
