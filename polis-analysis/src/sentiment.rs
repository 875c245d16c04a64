//! Sentiment collaborator.
//!
//! Discussion quality needs a per-comment sentiment and toxicity signal. The
//! signal comes from a [`SentimentService`] injected at construction time, so
//! a hosted model, a local lexicon, or a test double can sit behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use polis_common::Result;

/// Sentiment and toxicity of one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    /// Polarity in [-1, 1]
    pub score: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Toxicity in [0, 1]
    pub toxicity: f64,
}

impl SentimentSignal {
    /// Build a signal, clamping every field into its range.
    ///
    /// Non-finite values collapse to zero.
    pub fn new(score: f64, confidence: f64, toxicity: f64) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            score: finite(score).clamp(-1.0, 1.0),
            confidence: finite(confidence).clamp(0.0, 1.0),
            toxicity: finite(toxicity).clamp(0.0, 1.0),
        }
    }

    pub fn neutral() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Source of sentiment signals.
///
/// Implementations may fail or stall; callers bound every call with a
/// timeout and drop failed calls from their averages.
#[async_trait]
pub trait SentimentService: Send + Sync {
    /// Analyze one text.
    async fn analyze(&self, text: &str) -> Result<SentimentSignal>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

// ============================================================================
// Lexicon-based implementation
// ============================================================================

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "agree", "thanks", "thank", "helpful", "love", "like",
    "appreciate", "fair", "reasonable", "interesting", "insightful", "right", "better",
    "best", "happy", "hope", "support", "respect", "useful", "nice", "wonderful", "valid",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "wrong", "disagree", "hate", "worse", "worst", "angry",
    "sad", "unfair", "ridiculous", "disappointing", "fail", "failed", "problem", "harmful",
    "dangerous", "corrupt", "lies", "lie", "broken", "disaster", "horrible", "useless",
];

const TOXIC_WORDS: &[&str] = &[
    "idiot", "idiots", "moron", "morons", "stupid", "dumb", "shut", "scum", "trash",
    "pathetic", "loser", "losers", "clown", "clowns", "braindead", "disgusting",
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "isn't", "wasn't", "can't", "won't",
];

/// Tokens after a negator whose polarity is flipped.
const NEGATION_WINDOW: usize = 3;

/// Sentiment hits at which confidence reaches 1.0.
const CONFIDENCE_SATURATION: f64 = 4.0;

/// Toxic hits at which toxicity reaches 1.0.
const TOXICITY_SATURATION: f64 = 2.0;

/// Deterministic word-list sentiment.
///
/// Counts positive and negative words (flipping polarity for a few tokens
/// after a negator) and toxic words. Good enough to run the pipeline offline.
#[derive(Debug, Clone)]
pub struct LexiconSentiment {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    toxic: HashSet<&'static str>,
    negators: HashSet<&'static str>,
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconSentiment {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            toxic: TOXIC_WORDS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        }
    }

    /// Synchronous scoring used by the async trait method.
    pub fn score_text(&self, text: &str) -> SentimentSignal {
        let tokens: Vec<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut positive = 0.0;
        let mut negative = 0.0;
        let mut toxic = 0.0;
        let mut negated_for = 0usize;

        for token in &tokens {
            let token = token.as_str();
            if self.negators.contains(token) {
                negated_for = NEGATION_WINDOW;
                continue;
            }
            let flipped = negated_for > 0;
            negated_for = negated_for.saturating_sub(1);

            if self.toxic.contains(token) {
                toxic += 1.0;
                negative += 1.0;
            } else if self.positive.contains(token) {
                if flipped {
                    negative += 1.0;
                } else {
                    positive += 1.0;
                }
            } else if self.negative.contains(token) {
                if flipped {
                    positive += 1.0;
                } else {
                    negative += 1.0;
                }
            }
        }

        let total: f64 = positive + negative;
        if total == 0.0 {
            return SentimentSignal::neutral();
        }
        SentimentSignal::new(
            (positive - negative) / total,
            total / CONFIDENCE_SATURATION,
            toxic / TOXICITY_SATURATION,
        )
    }
}

#[async_trait]
impl SentimentService for LexiconSentiment {
    async fn analyze(&self, text: &str) -> Result<SentimentSignal> {
        Ok(self.score_text(text))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_clamped() {
        let s = SentimentSignal::new(3.0, -1.0, f64::NAN);
        assert_eq!(s.score, 1.0);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.toxicity, 0.0);
    }

    #[test]
    fn test_polarity() {
        let lexicon = LexiconSentiment::new();
        assert!(lexicon.score_text("Great point, thanks, really helpful").score > 0.5);
        assert!(lexicon.score_text("This is a terrible and harmful idea").score < -0.5);
        assert_eq!(lexicon.score_text("The meeting is on Tuesday"), SentimentSignal::neutral());
    }

    #[test]
    fn test_negation_flips_polarity() {
        let lexicon = LexiconSentiment::new();
        assert!(lexicon.score_text("That is not good").score < 0.0);
        assert!(lexicon.score_text("Honestly it isn't a bad plan").score > 0.0);
    }

    #[test]
    fn test_toxicity() {
        let lexicon = LexiconSentiment::new();
        let insult = lexicon.score_text("You idiots are pathetic");
        assert_eq!(insult.toxicity, 1.0);
        assert!(insult.score < 0.0);
        assert_eq!(lexicon.score_text("I disagree with this").toxicity, 0.0);
    }

    #[tokio::test]
    async fn test_service_impl() {
        let service = LexiconSentiment::new();
        let signal = service.analyze("good good good good good").await.unwrap();
        assert_eq!(signal.score, 1.0);
        assert_eq!(signal.confidence, 1.0);
        assert_eq!(service.name(), "lexicon");
    }
}
