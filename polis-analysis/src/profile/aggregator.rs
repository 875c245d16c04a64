//! Corpus aggregation and the privacy gate.
//!
//! The aggregator is crate-private: the only way to reach it from outside is
//! through the engine, which checks the same minimums before doing any work.

use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use polis_common::config::{
    AggregationConfig, PrivacyConfig, MIN_UNIQUE_USERS_FLOOR, MIN_WINDOW_DAYS_FLOOR,
};
use polis_common::{Error, Result};

use super::DimensionDistribution;
use crate::dimensions::{bucket_index, HISTOGRAM_BOUNDARIES};
use crate::types::{Dimension, PoliticalAnalysisResult, TopicMatch};

/// Output of the aggregation step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CorpusAggregate {
    pub distributions: BTreeMap<Dimension, DimensionDistribution>,
    pub dominant_topics: Vec<TopicMatch>,
    pub confidence: f64,
    pub scored_documents: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct CorpusAggregator {
    privacy: PrivacyConfig,
    config: AggregationConfig,
}

impl CorpusAggregator {
    pub(crate) fn new(privacy: PrivacyConfig, config: AggregationConfig) -> Self {
        Self { privacy, config }
    }

    /// Effective minimums; configuration can raise the floors but not lower them.
    pub(crate) fn minimums(&self) -> (usize, i64) {
        (
            self.privacy.min_unique_users.max(MIN_UNIQUE_USERS_FLOOR),
            self.privacy.min_window_days.max(MIN_WINDOW_DAYS_FLOOR),
        )
    }

    /// Fail with [`Error::InsufficientData`] when the sample is below the minimums.
    pub(crate) fn check_privacy(&self, unique_users: usize, window_days: i64) -> Result<()> {
        let (min_users, min_days) = self.minimums();
        if unique_users < min_users {
            return Err(Error::insufficient(
                format!("{unique_users} unique users is below the minimum of {min_users}"),
                unique_users,
                window_days,
            ));
        }
        if window_days < min_days {
            return Err(Error::insufficient(
                format!("{window_days}-day window is shorter than the minimum of {min_days} days"),
                unique_users,
                window_days,
            ));
        }
        Ok(())
    }

    pub(crate) fn aggregate(
        &self,
        results: &[PoliticalAnalysisResult],
        unique_users: usize,
        window_days: i64,
    ) -> Result<CorpusAggregate> {
        self.check_privacy(unique_users, window_days)?;
        if results.is_empty() {
            return Err(Error::Validation("cannot aggregate an empty corpus".to_string()));
        }

        let distributions = Dimension::ALL
            .iter()
            .map(|d| (*d, distribution(results, *d)))
            .collect();

        let mean_quality = results.iter().map(|r| r.analysis_quality).mean();
        let sample_factor =
            (results.len() as f64 / self.config.full_confidence_documents as f64).min(1.0);
        let confidence = (mean_quality * sample_factor).clamp(0.0, 1.0);

        let scored_documents = results.iter().filter(|r| r.has_signal()).count();
        debug!(
            documents = results.len(),
            scored = scored_documents,
            confidence,
            "Aggregated corpus"
        );

        Ok(CorpusAggregate {
            distributions,
            dominant_topics: self.topic_rollup(results),
            confidence,
            scored_documents,
        })
    }

    /// Mean confidence of every topic over all documents, top N.
    fn topic_rollup(&self, results: &[PoliticalAnalysisResult]) -> Vec<TopicMatch> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for result in results {
            for topic in &result.dominant_topics {
                *totals.entry(topic.topic_id.as_str()).or_default() += topic.confidence;
            }
        }

        let n = results.len() as f64;
        let mut topics: Vec<TopicMatch> = totals
            .into_iter()
            .map(|(id, total)| TopicMatch {
                topic_id: id.to_string(),
                confidence: (total / n).clamp(0.0, 1.0),
            })
            .collect();
        topics.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        topics.truncate(self.config.max_profile_topics);
        topics
    }
}

/// Distribution over documents with non-zero confidence on the axis.
fn distribution(
    results: &[PoliticalAnalysisResult],
    dimension: Dimension,
) -> DimensionDistribution {
    let scores: Vec<f64> = results
        .iter()
        .map(|r| r.score(dimension))
        .filter(|s| s.confidence > 0.0)
        .map(|s| s.score)
        .collect();
    if scores.is_empty() {
        return DimensionDistribution::empty();
    }

    let mut histogram = [0usize; 5];
    for score in &scores {
        histogram[bucket_index(*score, &HISTOGRAM_BOUNDARIES)] += 1;
    }

    DimensionDistribution {
        mean: scores.iter().mean(),
        std_dev: scores.iter().population_std_dev(),
        histogram,
        count: scores.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DimensionScore;

    fn result(economic: f64, confidence: f64) -> PoliticalAnalysisResult {
        let score = DimensionScore {
            dimension: Dimension::Economic,
            score: economic,
            confidence,
            evidence: Vec::new(),
            label: String::new(),
        };
        PoliticalAnalysisResult::from_scores(
            vec![score],
            vec![TopicMatch {
                topic_id: "economy".into(),
                confidence: 0.5,
            }],
        )
    }

    fn aggregator() -> CorpusAggregator {
        CorpusAggregator::new(PrivacyConfig::default(), AggregationConfig::default())
    }

    #[test]
    fn test_privacy_gate_boundaries() {
        let a = aggregator();
        let results = vec![result(0.5, 0.9)];
        let err = a.aggregate(&results, 24, 30).unwrap_err();
        assert!(err.is_privacy_violation());
        assert!(a.aggregate(&results, 25, 30).is_ok());
        assert!(a.aggregate(&results, 25, 6).unwrap_err().is_privacy_violation());
        assert!(a.aggregate(&results, 25, 7).is_ok());
    }

    #[test]
    fn test_config_cannot_lower_floors() {
        let a = CorpusAggregator::new(
            PrivacyConfig {
                min_unique_users: 3,
                min_window_days: 1,
            },
            AggregationConfig::default(),
        );
        assert_eq!(a.minimums(), (25, 7));
        assert!(a.check_privacy(10, 30).is_err());
    }

    #[test]
    fn test_distribution_statistics() {
        let results = vec![
            result(-1.0, 1.0),
            result(-0.2, 1.0),
            result(0.2, 1.0),
            result(1.0, 1.0),
            // no evidence on the axis, excluded from its distribution
            result(0.0, 0.0),
        ];
        let agg = aggregator().aggregate(&results, 30, 14).unwrap();
        let econ = &agg.distributions[&Dimension::Economic];
        assert_eq!(econ.count, 4);
        assert!(econ.mean.abs() < 1e-12);
        let expected_sd = ((1.0 + 0.04 + 0.04 + 1.0) / 4.0_f64).sqrt();
        assert!((econ.std_dev - expected_sd).abs() < 1e-12);
        assert_eq!(econ.histogram, [1, 0, 1, 1, 1]);
        assert_eq!(agg.distributions[&Dimension::Social], DimensionDistribution::empty());
        assert_eq!(agg.scored_documents, 4);
    }

    #[test]
    fn test_confidence_scales_with_sample() {
        // quality per document is 0.9 / 3 = 0.3
        let results: Vec<_> = (0..50).map(|_| result(0.5, 0.9)).collect();
        let agg = aggregator().aggregate(&results, 30, 14).unwrap();
        assert!((agg.confidence - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_topic_rollup() {
        let results = vec![result(0.5, 0.9), PoliticalAnalysisResult::neutral()];
        let agg = aggregator().aggregate(&results, 30, 14).unwrap();
        assert_eq!(agg.dominant_topics.len(), 1);
        assert!((agg.dominant_topics[0].confidence - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        assert!(aggregator().aggregate(&[], 30, 14).unwrap_err().is_validation());
    }
}
