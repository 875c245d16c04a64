//! Discussion quality scoring.
//!
//! Four sub-scores in [0, 1] combine into an overall score:
//!
//! - **civility**: `1 − mean toxicity` over comments whose sentiment call succeeded
//! - **constructiveness**: weighted blend of average length (capped), the share
//!   of comments using reasoning connectors, and the share asking substantive
//!   questions
//! - **viewpoint diversity**: entropy of positive/neutral/negative sentiment
//!   buckets, normalized by `ln 3`
//! - **engagement**: mean of reply rate and normalized reply depth

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use polis_common::config::QualityConfig;
use polis_common::{Error, Result, Validate};

use crate::sentiment::{SentimentService, SentimentSignal};
use crate::types::{Document, DocumentKind};

/// One comment in a discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    /// Comment or post this one replies to
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Reply depth; 0 for top-level comments
    #[serde(default)]
    pub depth: u32,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parent_id: None,
            depth: 0,
        }
    }

    pub fn reply_to(mut self, parent_id: impl Into<String>, depth: u32) -> Self {
        self.parent_id = Some(parent_id.into());
        self.depth = depth;
        self
    }

    fn is_reply(&self) -> bool {
        self.parent_id.is_some() || self.depth > 0
    }
}

impl From<&Document> for Comment {
    fn from(doc: &Document) -> Self {
        Self {
            text: doc.text.clone(),
            parent_id: doc.parent_id.clone(),
            depth: doc.depth,
        }
    }
}

/// Whether enough comments were available to score a discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Determined,
    Undetermined,
}

/// Quality of one discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionQualityResult {
    pub status: QualityStatus,
    pub civility: f64,
    pub constructiveness: f64,
    pub viewpoint_diversity: f64,
    pub engagement_quality: f64,
    pub overall: f64,
    pub confidence: f64,
    pub comments_analyzed: usize,
    /// Fraction of comments with a usable sentiment signal
    pub sentiment_coverage: f64,
}

impl DiscussionQualityResult {
    /// Result for a discussion too small to score.
    pub fn undetermined(comments_analyzed: usize) -> Self {
        Self {
            status: QualityStatus::Undetermined,
            civility: 0.0,
            constructiveness: 0.0,
            viewpoint_diversity: 0.0,
            engagement_quality: 0.0,
            overall: 0.0,
            confidence: 0.0,
            comments_analyzed,
            sentiment_coverage: 0.0,
        }
    }

    pub fn is_determined(&self) -> bool {
        self.status == QualityStatus::Determined
    }
}

/// Sub-score used for civility and viewpoint diversity when no sentiment
/// call succeeded. Confidence is zero in that case.
const NO_SIGNAL_SCORE: f64 = 0.5;

/// Scores discussions using an injected sentiment service.
pub struct DiscussionQualityScorer {
    config: QualityConfig,
    sentiment: Arc<dyn SentimentService>,
    connectors: Option<Regex>,
}

impl std::fmt::Debug for DiscussionQualityScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscussionQualityScorer")
            .field("config", &self.config)
            .field("sentiment", &self.sentiment.name())
            .finish()
    }
}

impl DiscussionQualityScorer {
    pub fn new(config: QualityConfig, sentiment: Arc<dyn SentimentService>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;

        let words: Vec<String> = config
            .reasoning_connectors
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();
        let connectors = if words.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
            let regex = Regex::new(&pattern)
                .map_err(|e| Error::Validation(format!("reasoning connectors: {e}")))?;
            Some(regex)
        };

        Ok(Self {
            config,
            sentiment,
            connectors,
        })
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Score a discussion.
    ///
    /// Fewer comments than the configured minimum yields an undetermined
    /// result. Sentiment failures and timeouts lower confidence but never fail
    /// the call.
    pub async fn calculate(&self, comments: &[Comment]) -> DiscussionQualityResult {
        let n = comments.len();
        if n < self.config.min_comments {
            debug!(
                comments = n,
                min = self.config.min_comments,
                "Too few comments for quality scoring"
            );
            return DiscussionQualityResult::undetermined(n);
        }

        let signals: Vec<SentimentSignal> = self
            .collect_signals(comments)
            .await
            .into_iter()
            .flatten()
            .collect();
        let sentiment_coverage = signals.len() as f64 / n as f64;

        let (civility, viewpoint_diversity) = if signals.is_empty() {
            warn!(
                service = self.sentiment.name(),
                comments = n,
                "No sentiment signal available; civility and viewpoint diversity are unscored"
            );
            (NO_SIGNAL_SCORE, NO_SIGNAL_SCORE)
        } else {
            let toxicity_rate =
                signals.iter().map(|s| s.toxicity).sum::<f64>() / signals.len() as f64;
            (
                (1.0 - toxicity_rate).clamp(0.0, 1.0),
                self.viewpoint_diversity(&signals),
            )
        };

        let constructiveness = self.constructiveness(comments);
        let engagement_quality = self.engagement(comments);

        let w = &self.config.weights;
        let weight_sum = w.civility + w.constructiveness + w.viewpoint_diversity + w.engagement;
        let overall = if weight_sum > 0.0 {
            (w.civility * civility
                + w.constructiveness * constructiveness
                + w.viewpoint_diversity * viewpoint_diversity
                + w.engagement * engagement_quality)
                / weight_sum
        } else {
            0.0
        };

        let sample = (n as f64 / self.config.full_confidence_comments as f64).min(1.0);

        DiscussionQualityResult {
            status: QualityStatus::Determined,
            civility,
            constructiveness,
            viewpoint_diversity,
            engagement_quality,
            overall: overall.clamp(0.0, 1.0),
            confidence: (sample * sentiment_coverage).clamp(0.0, 1.0),
            comments_analyzed: n,
            sentiment_coverage,
        }
    }

    /// One entry per comment, in input order; `None` where the call failed or timed out.
    ///
    /// Each call owns its text and a handle to the service, so the returned
    /// future stays `Send` and can be driven from a spawned task.
    async fn collect_signals(&self, comments: &[Comment]) -> Vec<Option<SentimentSignal>> {
        let timeout = Duration::from_millis(self.config.sentiment_timeout_ms);
        let texts: Vec<String> = comments.iter().map(|c| c.text.clone()).collect();
        let sentiment = Arc::clone(&self.sentiment);

        stream::iter(texts.into_iter().enumerate())
            .map(move |(index, text)| {
                let service = Arc::clone(&sentiment);
                async move {
                    match tokio::time::timeout(timeout, service.analyze(&text)).await {
                        Ok(Ok(signal)) => Some(signal),
                        Ok(Err(e)) => {
                            warn!(
                                service = service.name(),
                                index,
                                error = %e,
                                "Sentiment call failed; excluding comment"
                            );
                            None
                        }
                        Err(_) => {
                            warn!(
                                service = service.name(),
                                index,
                                timeout_ms = timeout.as_millis() as u64,
                                "Sentiment call timed out; excluding comment"
                            );
                            None
                        }
                    }
                }
            })
            .buffered(self.config.sentiment_concurrency.max(1))
            .collect::<Vec<_>>()
            .await
    }

    fn viewpoint_diversity(&self, signals: &[SentimentSignal]) -> f64 {
        let band = self.config.neutral_band;
        let mut buckets = [0usize; 3];
        for signal in signals {
            let bucket = if signal.score > band {
                0
            } else if signal.score < -band {
                2
            } else {
                1
            };
            buckets[bucket] += 1;
        }
        normalized_entropy(&buckets)
    }

    fn constructiveness(&self, comments: &[Comment]) -> f64 {
        let n = comments.len() as f64;
        let cw = &self.config.constructiveness_weights;

        let avg_len = comments
            .iter()
            .map(|c| c.text.trim().chars().count() as f64)
            .sum::<f64>()
            / n;
        let length = (avg_len / self.config.length_saturation_chars).min(1.0);

        let reasoning = match &self.connectors {
            Some(re) => comments.iter().filter(|c| re.is_match(&c.text)).count() as f64 / n,
            None => 0.0,
        };

        let min_words = self.config.substantive_question_min_words;
        let questions = comments
            .iter()
            .filter(|c| has_substantive_question(&c.text, min_words))
            .count() as f64
            / n;

        let weight_sum = cw.length + cw.reasoning + cw.questions;
        if weight_sum <= 0.0 {
            return 0.0;
        }
        ((cw.length * length + cw.reasoning * reasoning + cw.questions * questions) / weight_sum)
            .clamp(0.0, 1.0)
    }

    fn engagement(&self, comments: &[Comment]) -> f64 {
        let n = comments.len() as f64;
        let reply_rate = comments.iter().filter(|c| c.is_reply()).count() as f64 / n;
        let mean_depth = comments.iter().map(|c| f64::from(c.depth)).sum::<f64>() / n;
        let depth = (mean_depth / self.config.depth_saturation).min(1.0);
        (0.5 * reply_rate + 0.5 * depth).clamp(0.0, 1.0)
    }
}

/// Comments from the comment-kind documents of a corpus.
pub fn comments_from_documents(documents: &[Document]) -> Vec<Comment> {
    documents
        .iter()
        .filter(|d| d.kind == DocumentKind::Comment)
        .map(Comment::from)
        .collect()
}

/// Shannon entropy of bucket counts divided by `ln(bucket count)`.
fn normalized_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 || counts.len() < 2 {
        return 0.0;
    }
    let total = total as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.ln()
        })
        .sum();
    (entropy / (counts.len() as f64).ln()).clamp(0.0, 1.0)
}

/// Whether any question in `text` has at least `min_words` words.
fn has_substantive_question(text: &str, min_words: usize) -> bool {
    let parts: Vec<&str> = text.split('?').collect();
    // The last part follows the final '?' and is not a question
    parts[..parts.len().saturating_sub(1)].iter().any(|part| {
        let sentence = part.rsplit(['.', '!', '\n']).next().unwrap_or(part);
        sentence.split_whitespace().count() >= min_words
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(SentimentSignal);

    #[async_trait]
    impl SentimentService for Fixed {
        async fn analyze(&self, _text: &str) -> Result<SentimentSignal> {
            Ok(self.0)
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Polarity taken from the first word: "pos", "neg" or anything else.
    struct ByPrefix;

    #[async_trait]
    impl SentimentService for ByPrefix {
        async fn analyze(&self, text: &str) -> Result<SentimentSignal> {
            let score = match text.split_whitespace().next() {
                Some("pos") => 0.8,
                Some("neg") => -0.8,
                _ => 0.0,
            };
            Ok(SentimentSignal::new(score, 1.0, 0.0))
        }
        fn name(&self) -> &str {
            "prefix"
        }
    }

    struct Failing;

    #[async_trait]
    impl SentimentService for Failing {
        async fn analyze(&self, _text: &str) -> Result<SentimentSignal> {
            Err(Error::DependencyUnavailable("model offline".into()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    fn scorer(service: impl SentimentService + 'static) -> DiscussionQualityScorer {
        DiscussionQualityScorer::new(QualityConfig::default(), Arc::new(service)).unwrap()
    }

    fn comments(texts: &[&str]) -> Vec<Comment> {
        texts.iter().map(|t| Comment::new(*t)).collect()
    }

    #[tokio::test]
    async fn test_too_few_comments_is_undetermined() {
        let result = scorer(ByPrefix).calculate(&comments(&["a", "b", "c", "d"])).await;
        assert_eq!(result.status, QualityStatus::Undetermined);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.comments_analyzed, 4);
    }

    #[tokio::test]
    async fn test_civility_from_toxicity() {
        let s = scorer(Fixed(SentimentSignal::new(0.0, 1.0, 0.25)));
        let result = s.calculate(&comments(&["x"; 10])).await;
        assert!(result.is_determined());
        assert!((result.civility - 0.75).abs() < 1e-12);
        assert!((result.confidence - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_viewpoint_diversity_is_maximal_for_even_buckets() {
        let s = scorer(ByPrefix);
        let even = s
            .calculate(&comments(&["pos a", "neg b", "meh c", "pos d", "neg e", "meh f"]))
            .await;
        assert!((even.viewpoint_diversity - 1.0).abs() < 1e-12);

        let uniform = s.calculate(&comments(&["pos"; 6])).await;
        assert_eq!(uniform.viewpoint_diversity, 0.0);
    }

    #[tokio::test]
    async fn test_failed_calls_are_excluded() {
        let result = scorer(Failing).calculate(&comments(&["x"; 8])).await;
        assert!(result.is_determined());
        assert_eq!(result.sentiment_coverage, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.civility, NO_SIGNAL_SCORE);
    }

    #[tokio::test]
    async fn test_constructiveness_components() {
        let s = scorer(ByPrefix);
        let texts = [
            "I think so because the data supports it.",
            "Why would the council approve this budget twice?",
            "ok",
            "ok",
            "ok",
        ];
        let result = s.calculate(&comments(&texts)).await;
        let avg_len = texts.iter().map(|t| t.chars().count() as f64).sum::<f64>() / 5.0;
        let expected = 0.4 * (avg_len / 400.0) + 0.4 * 0.2 + 0.2 * 0.2;
        assert!((result.constructiveness - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_engagement_from_replies() {
        let s = scorer(ByPrefix);
        let mut thread = comments(&["a"; 4]);
        thread.push(Comment::new("b").reply_to("c1", 4));
        thread.push(Comment::new("c").reply_to("c1", 4));
        thread.push(Comment::new("d").reply_to("c1", 4));
        thread.push(Comment::new("e").reply_to("c1", 4));
        // reply rate 0.5, mean depth 2 of 4
        let result = s.calculate(&thread).await;
        assert!((result.engagement_quality - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_substantive_questions() {
        assert!(has_substantive_question("Fine. But what does the budget actually fund?", 6));
        assert!(!has_substantive_question("Really?", 6));
        assert!(!has_substantive_question("No question here at all, friend.", 6));
    }

    #[test]
    fn test_normalized_entropy() {
        assert_eq!(normalized_entropy(&[0, 0, 0]), 0.0);
        assert_eq!(normalized_entropy(&[5, 0, 0]), 0.0);
        assert!((normalized_entropy(&[2, 2, 2]) - 1.0).abs() < 1e-12);
    }
}
