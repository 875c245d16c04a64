//! Corpus pipeline: map documents to per-document results on a bounded worker
//! pool, then reduce them into a [`CommunityProfile`].
//!
//! The privacy gate runs before any document is scored and again inside the
//! aggregation step. A cancelled run returns [`Error::Cancelled`] and never a
//! partial profile.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use polis_common::config::{AnalysisConfig, Config};
use polis_common::logging::generate_run_id;
use polis_common::{Error, Result, ResultExt, Validate};

use crate::dimensions::DimensionScorers;
use crate::lexicon::{DimensionLexicons, TopicTaxonomy};
use crate::profile::{
    ClusterIdentifier, CommunityProfile, CorpusAggregator, DiversityCalculator, ProfileParts,
    SampleSize,
};
use crate::quality::{comments_from_documents, DiscussionQualityResult, DiscussionQualityScorer};
use crate::sentiment::SentimentService;
use crate::topics::TopicDetector;
use crate::types::{Document, DocumentKind, PoliticalAnalysisResult, TimeWindow};

// ============================================================================
// Request
// ============================================================================

/// A corpus to profile, as supplied by the collection layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub subreddit: String,
    pub window: TimeWindow,
    /// Distinct authors in the corpus, counted by the collection layer
    pub unique_user_count: usize,
    pub documents: Vec<Document>,
}

impl ProfileRequest {
    pub fn window_days(&self) -> i64 {
        self.window.days()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Scoring stages shared with pool workers.
#[derive(Debug)]
struct Stages {
    detector: TopicDetector,
    scorers: DimensionScorers,
    max_document_chars: usize,
}

/// Result of the map phase for one document.
struct Scored {
    result: PoliticalAnalysisResult,
    rejected: bool,
}

impl Stages {
    fn analyze(&self, text: &str) -> PoliticalAnalysisResult {
        let topics = self.detector.detect_topics(text);
        let scores = self.scorers.analyze_all(text, &topics);
        PoliticalAnalysisResult::from_scores(scores, topics)
    }

    /// Score one document, turning malformed input into a neutral result.
    fn score(&self, text: &str) -> Scored {
        if text.contains('\0') || text.chars().count() > self.max_document_chars {
            return Scored {
                result: PoliticalAnalysisResult::neutral(),
                rejected: true,
            };
        }
        Scored {
            result: self.analyze(text),
            rejected: false,
        }
    }
}

/// Owned view of a request, handed to the reduce job.
struct CorpusSummary {
    subreddit: String,
    window: TimeWindow,
    unique_users: usize,
    posts: usize,
    comments: usize,
    outside_window: usize,
}

impl CorpusSummary {
    fn of(request: &ProfileRequest) -> Self {
        let posts = request
            .documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Post)
            .count();
        let outside_window = request
            .documents
            .iter()
            .filter(|d| !request.window.contains(d.created_at))
            .count();
        Self {
            subreddit: request.subreddit.clone(),
            window: request.window,
            unique_users: request.unique_user_count,
            posts,
            comments: request.documents.len() - posts,
            outside_window,
        }
    }
}

/// Reduce stages: aggregation, diversity and clustering.
#[derive(Debug)]
struct Reducer {
    aggregator: CorpusAggregator,
    diversity: DiversityCalculator,
    clusters: ClusterIdentifier,
}

impl Reducer {
    /// Aggregate, then compute diversity and clusters over the points that carried evidence.
    fn reduce(
        &self,
        corpus: CorpusSummary,
        scored: Vec<Scored>,
        discussion_quality: Option<DiscussionQualityResult>,
    ) -> Result<CommunityProfile> {
        let rejected_documents = scored.iter().filter(|s| s.rejected).count();
        let results: Vec<PoliticalAnalysisResult> = scored.into_iter().map(|s| s.result).collect();

        let aggregate = self
            .aggregator
            .aggregate(&results, corpus.unique_users, corpus.window.days())?;

        let (points, weights): (Vec<[f64; 3]>, Vec<f64>) = results
            .iter()
            .filter(|r| r.has_signal())
            .map(|r| (r.point(), r.analysis_quality))
            .unzip();
        let diversity_index = self
            .diversity
            .calculate(&points, &weights)
            .context("diversity")?;
        let clusters = self.clusters.identify(&points);
        debug!(
            points = points.len(),
            diversity_index,
            clusters = clusters.len(),
            "Reduced corpus"
        );

        let sample_size = SampleSize {
            posts: corpus.posts,
            comments: corpus.comments,
            unique_users: corpus.unique_users,
            scored_documents: aggregate.scored_documents,
            rejected_documents,
            outside_window: corpus.outside_window,
        };

        Ok(CommunityProfile::assemble(ProfileParts {
            subreddit: corpus.subreddit,
            window: corpus.window,
            sample_size,
            aggregate,
            diversity_index,
            clusters,
            discussion_quality,
        }))
    }
}

/// The political dimensional analysis engine.
#[derive(Debug, Clone)]
pub struct PoliticalAnalysisEngine {
    config: AnalysisConfig,
    stages: Arc<Stages>,
    reducer: Arc<Reducer>,
    pool: Arc<rayon::ThreadPool>,
}

impl PoliticalAnalysisEngine {
    /// Build an engine from validated configuration and lexical tables.
    pub fn new(
        config: AnalysisConfig,
        taxonomy: TopicTaxonomy,
        lexicons: DimensionLexicons,
    ) -> Result<Self> {
        config.validate().map_err(|e| Error::Config(e.to_string()))?;
        lexicons.validate_against(&taxonomy)?;

        let threads = if config.runtime.parallelism == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            config.runtime.parallelism
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("polis-map-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("building worker pool: {e}")))?;

        let stages = Stages {
            detector: TopicDetector::new(
                Arc::new(taxonomy),
                config.matching.clone(),
                config.topics.clone(),
            ),
            scorers: DimensionScorers::new(&lexicons, &config.matching, &config.dimensions),
            max_document_chars: config.runtime.max_document_chars,
        };

        debug!(threads, "Created analysis engine");

        let reducer = Reducer {
            aggregator: CorpusAggregator::new(config.privacy.clone(), config.aggregation.clone()),
            diversity: DiversityCalculator::new(config.diversity.clone()),
            clusters: ClusterIdentifier::new(
                config.clustering.clone(),
                config.dimensions.label_boundaries,
            ),
        };

        Ok(Self {
            stages: Arc::new(stages),
            reducer: Arc::new(reducer),
            pool: Arc::new(pool),
            config,
        })
    }

    /// Engine with default configuration and the built-in taxonomy and lexicon.
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            AnalysisConfig::default(),
            TopicTaxonomy::builtin()?,
            DimensionLexicons::builtin()?,
        )
    }

    /// Engine from a loaded [`Config`], reading taxonomy and lexicon files when configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let taxonomy = match &config.lexicons.taxonomy_path {
            Some(path) => TopicTaxonomy::load(path)?,
            None => TopicTaxonomy::builtin()?,
        };
        let lexicons = match &config.lexicons.lexicon_path {
            Some(path) => DimensionLexicons::load(path)?,
            None => DimensionLexicons::builtin()?,
        };
        Self::new(config.analysis.clone(), taxonomy, lexicons)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn detector(&self) -> &TopicDetector {
        &self.stages.detector
    }

    /// Topics and dimension scores for one text. Pure.
    pub fn analyze_document(&self, text: &str) -> PoliticalAnalysisResult {
        self.stages.analyze(text)
    }

    /// Score many texts on the worker pool, preserving order.
    pub fn analyze_batch(&self, texts: &[String]) -> Vec<PoliticalAnalysisResult> {
        let stages = &self.stages;
        self.pool
            .install(|| texts.par_iter().map(|t| stages.score(t).result).collect())
    }

    /// Build a community profile.
    pub async fn build_profile(
        &self,
        request: &ProfileRequest,
        cancel: &CancellationToken,
    ) -> Result<CommunityProfile> {
        self.run(request, None, cancel).await
    }

    /// Build a community profile and score its comment threads for discussion quality.
    pub async fn build_profile_with_quality(
        &self,
        request: &ProfileRequest,
        sentiment: Arc<dyn SentimentService>,
        cancel: &CancellationToken,
    ) -> Result<CommunityProfile> {
        self.run(request, Some(sentiment), cancel).await
    }

    async fn run(
        &self,
        request: &ProfileRequest,
        sentiment: Option<Arc<dyn SentimentService>>,
        cancel: &CancellationToken,
    ) -> Result<CommunityProfile> {
        let run_id = generate_run_id();
        let span = info_span!(
            "profile_run",
            run_id = %run_id,
            subreddit = %request.subreddit,
            documents = request.documents.len()
        );

        async move {
            let window_days = request.window_days();
            self.reducer
                .aggregator
                .check_privacy(request.unique_user_count, window_days)?;
            if request.documents.is_empty() {
                return Err(Error::Validation("profile request has no documents".to_string()));
            }

            info!(
                unique_users = request.unique_user_count,
                window_days, "Starting profile run"
            );

            let corpus = CorpusSummary::of(request);
            if corpus.outside_window > 0 {
                warn!(
                    outside_window = corpus.outside_window,
                    "Documents fall outside the profile window"
                );
            }

            let texts: Vec<String> = request.documents.iter().map(|d| d.text.clone()).collect();
            let scored = self.map_phase(texts, cancel).await?;

            let discussion_quality = match sentiment {
                Some(service) => Some(self.score_quality(request, service, cancel).await?),
                None => None,
            };

            let reducer = Arc::clone(&self.reducer);
            let profile = self
                .on_pool(move || reducer.reduce(corpus, scored, discussion_quality), cancel)
                .await??;
            info!(
                profile_id = %profile.profile_id(),
                diversity = profile.diversity_index(),
                clusters = profile.clusters().len(),
                confidence = profile.confidence(),
                "Profile run complete"
            );
            Ok(profile)
        }
        .instrument(span)
        .await
    }

    /// Run a CPU-bound job on the worker pool without blocking the runtime.
    ///
    /// The job runs inside the caller's span. On cancellation the result is
    /// abandoned and the job finishes unobserved.
    async fn on_pool<T, F>(&self, job: F, cancel: &CancellationToken) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let span = Span::current();
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pool.spawn(move || {
            let _entered = span.enter();
            // The receiver is gone only if the run was cancelled
            let _ = tx.send(job());
        });

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = rx => {
                result.map_err(|_| Error::Computation("worker pool dropped its job".to_string()))
            }
        }
    }

    /// Score documents in batches on the worker pool, checking for cancellation
    /// between batches.
    async fn map_phase(
        &self,
        texts: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Scored>> {
        let batch_size = self.config.runtime.batch_size.max(1);
        let mut scored = Vec::with_capacity(texts.len());
        let mut remaining = texts.into_iter().peekable();
        let mut index = 0;

        while remaining.peek().is_some() {
            if cancel.is_cancelled() {
                warn!(batch = index, "Run cancelled; discarding partial results");
                return Err(Error::Cancelled);
            }

            let chunk: Vec<String> = remaining.by_ref().take(batch_size).collect();
            let stages = Arc::clone(&self.stages);
            let job = move || -> Vec<Scored> {
                chunk.par_iter().map(|t| stages.score(t)).collect()
            };
            let batch = match self.on_pool(job, cancel).await {
                Ok(batch) => batch,
                Err(e) => {
                    if e.is_cancelled() {
                        warn!(batch = index, "Run cancelled; discarding partial results");
                    }
                    return Err(e);
                }
            };

            let rejected = batch.iter().filter(|s| s.rejected).count();
            if rejected > 0 {
                warn!(batch = index, rejected, "Rejected malformed documents");
            }
            debug!(batch = index, documents = batch.len(), "Scored batch");
            scored.extend(batch);
            index += 1;
        }

        Ok(scored)
    }

    async fn score_quality(
        &self,
        request: &ProfileRequest,
        sentiment: Arc<dyn SentimentService>,
        cancel: &CancellationToken,
    ) -> Result<DiscussionQualityResult> {
        let scorer = DiscussionQualityScorer::new(self.config.quality.clone(), sentiment)
            .context("discussion quality")?;
        let comments = comments_from_documents(&request.documents);
        debug!(comments = comments.len(), "Scoring discussion quality");

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = scorer.calculate(&comments) => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dimension, Document};
    use chrono::{Duration, Utc};

    fn request(texts: &[&str], users: usize, days: i64) -> ProfileRequest {
        let end = Utc::now();
        ProfileRequest {
            subreddit: "r/test".into(),
            window: TimeWindow::new(end - Duration::days(days), end).unwrap(),
            unique_user_count: users,
            documents: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Document {
                    text: t.to_string(),
                    author_id: format!("u{}", i % users.max(1)),
                    created_at: end,
                    kind: DocumentKind::Post,
                    parent_id: None,
                    depth: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_analyze_document_scenarios() {
        let engine = PoliticalAnalysisEngine::with_defaults().unwrap();
        let market = engine
            .analyze_document("Free markets, competition, and privatization drive innovation");
        assert!(market.score(Dimension::Economic).score > 0.2);
        assert_eq!(market.dominant_dimension, Some(Dimension::Economic));

        let empty = engine.analyze_document("");
        assert_eq!(empty, PoliticalAnalysisResult::neutral());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.privacy.min_unique_users = 3;
        let err = PoliticalAnalysisEngine::new(
            config,
            TopicTaxonomy::builtin().unwrap(),
            DimensionLexicons::builtin().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        let engine = PoliticalAnalysisEngine::with_defaults().unwrap();
        let texts = vec!["free market\0".to_string(), "tax cuts".repeat(10_000)];
        let results = engine.analyze_batch(&texts);
        assert!(results.iter().all(|r| !r.has_signal()));
    }

    #[tokio::test]
    async fn test_documents_outside_window_are_counted() {
        let engine = PoliticalAnalysisEngine::with_defaults().unwrap();
        let mut request = request(&["free markets and competition"; 30], 25, 30);
        request.documents[0].created_at = request.window.start - Duration::days(1);
        request.documents[1].created_at = request.window.end + Duration::hours(1);

        let profile = engine
            .build_profile(&request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(profile.sample_size().outside_window, 2);
        assert_eq!(profile.sample_size().documents(), 30);
    }

    #[tokio::test]
    async fn test_privacy_gate_runs_before_scoring() {
        let engine = PoliticalAnalysisEngine::with_defaults().unwrap();
        let err = engine
            .build_profile(&request(&["free markets"], 24, 30), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_privacy_violation());
    }

    #[tokio::test]
    async fn test_cancelled_run_yields_no_profile() {
        let engine = PoliticalAnalysisEngine::with_defaults().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine
            .build_profile(&request(&["free markets"; 30], 25, 30), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
