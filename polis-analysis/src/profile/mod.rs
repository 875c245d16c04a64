//! Community-level profile: the reduce phase of a corpus run.
//!
//! A [`CommunityProfile`] is an immutable snapshot for one subreddit and time
//! window. It only carries aggregates; no per-document or per-author data
//! survives into it.

pub(crate) mod aggregator;
pub mod clusters;
pub mod comparison;
pub mod diversity;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use polis_common::config::{MIN_UNIQUE_USERS_FLOOR, MIN_WINDOW_DAYS_FLOOR};
use polis_common::{Error, Result};

use crate::quality::DiscussionQualityResult;
use crate::types::{Dimension, TimeWindow, TopicMatch};

pub(crate) use aggregator::{CorpusAggregate, CorpusAggregator};
pub use clusters::{identify_political_clusters, silhouette_score, Cluster, ClusterIdentifier};
pub use comparison::{DimensionShift, ProfileComparison};
pub use diversity::{calculate_political_diversity, DiversityCalculator};

/// Distribution of document positions on one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDistribution {
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Counts per bucket, split at [-0.6, -0.2, 0.2, 0.6]
    pub histogram: [usize; 5],
    /// Documents with evidence on this axis
    pub count: usize,
}

impl DimensionDistribution {
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            std_dev: 0.0,
            histogram: [0; 5],
            count: 0,
        }
    }
}

/// What went into a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSize {
    pub posts: usize,
    pub comments: usize,
    pub unique_users: usize,
    /// Documents that carried evidence on at least one axis
    pub scored_documents: usize,
    /// Documents rejected at the document boundary and scored as neutral
    pub rejected_documents: usize,
    /// Documents whose timestamp falls outside the profile window
    #[serde(default)]
    pub outside_window: usize,
}

impl SampleSize {
    /// Posts plus comments.
    pub fn documents(&self) -> usize {
        self.posts + self.comments
    }
}

/// Aggregate political profile of one community over one time window.
///
/// Deserialized profiles go through the same privacy floors the engine
/// enforces, so a stored profile cannot describe a smaller community than a
/// live run could.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfileRepr")]
pub struct CommunityProfile {
    profile_id: Uuid,
    subreddit: String,
    window: TimeWindow,
    generated_at: DateTime<Utc>,
    sample_size: SampleSize,
    dimensions: BTreeMap<Dimension, DimensionDistribution>,
    diversity_index: f64,
    clusters: BTreeMap<usize, Cluster>,
    dominant_topics: Vec<TopicMatch>,
    discussion_quality: Option<DiscussionQualityResult>,
    confidence: f64,
}

/// Parts of a profile computed after aggregation.
pub(crate) struct ProfileParts {
    pub subreddit: String,
    pub window: TimeWindow,
    pub sample_size: SampleSize,
    pub aggregate: CorpusAggregate,
    pub diversity_index: f64,
    pub clusters: BTreeMap<usize, Cluster>,
    pub discussion_quality: Option<DiscussionQualityResult>,
}

impl CommunityProfile {
    /// Only the engine assembles profiles, after the privacy gate has passed.
    pub(crate) fn assemble(parts: ProfileParts) -> Self {
        Self {
            profile_id: Uuid::new_v4(),
            subreddit: parts.subreddit,
            window: parts.window,
            generated_at: Utc::now(),
            sample_size: parts.sample_size,
            dimensions: parts.aggregate.distributions,
            diversity_index: parts.diversity_index,
            clusters: parts.clusters,
            dominant_topics: parts.aggregate.dominant_topics,
            discussion_quality: parts.discussion_quality,
            confidence: parts.aggregate.confidence,
        }
    }

    pub fn profile_id(&self) -> Uuid {
        self.profile_id
    }

    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn sample_size(&self) -> &SampleSize {
        &self.sample_size
    }

    pub fn dimensions(&self) -> &BTreeMap<Dimension, DimensionDistribution> {
        &self.dimensions
    }

    /// Distribution on one axis; empty when the axis never saw evidence.
    pub fn dimension(&self, dimension: Dimension) -> DimensionDistribution {
        self.dimensions
            .get(&dimension)
            .cloned()
            .unwrap_or_else(DimensionDistribution::empty)
    }

    pub fn diversity_index(&self) -> f64 {
        self.diversity_index
    }

    pub fn clusters(&self) -> &BTreeMap<usize, Cluster> {
        &self.clusters
    }

    pub fn dominant_topics(&self) -> &[TopicMatch] {
        &self.dominant_topics
    }

    pub fn discussion_quality(&self) -> Option<&DiscussionQualityResult> {
        self.discussion_quality.as_ref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a stored profile, rejecting any that breaks the privacy floors
    /// or carries out-of-range measures.
    pub fn from_json(json: &str) -> Result<Self> {
        let repr: ProfileRepr = serde_json::from_str(json)?;
        Self::try_from(repr)
    }
}

// ============================================================================
// Deserialization
// ============================================================================

/// Wire shape of a [`CommunityProfile`], checked before it becomes one.
#[derive(Deserialize)]
struct ProfileRepr {
    profile_id: Uuid,
    subreddit: String,
    window: TimeWindow,
    generated_at: DateTime<Utc>,
    sample_size: SampleSize,
    dimensions: BTreeMap<Dimension, DimensionDistribution>,
    diversity_index: f64,
    clusters: BTreeMap<usize, Cluster>,
    dominant_topics: Vec<TopicMatch>,
    #[serde(default)]
    discussion_quality: Option<DiscussionQualityResult>,
    confidence: f64,
}

impl TryFrom<ProfileRepr> for CommunityProfile {
    type Error = Error;

    fn try_from(repr: ProfileRepr) -> Result<Self> {
        let window = TimeWindow::new(repr.window.start, repr.window.end)?;
        let users = repr.sample_size.unique_users;
        let days = window.days();
        if users < MIN_UNIQUE_USERS_FLOOR {
            return Err(Error::insufficient(
                format!("stored profile covers {users} unique users"),
                users,
                days,
            ));
        }
        if days < MIN_WINDOW_DAYS_FLOOR {
            return Err(Error::insufficient(
                format!("stored profile covers a {days}-day window"),
                users,
                days,
            ));
        }

        unit_range("diversity_index", repr.diversity_index)?;
        unit_range("confidence", repr.confidence)?;
        for (dimension, distribution) in &repr.dimensions {
            if !(-1.0..=1.0).contains(&distribution.mean) {
                return Err(out_of_range(&format!("{dimension} mean"), distribution.mean));
            }
            if !(0.0..=1.0).contains(&distribution.std_dev) {
                return Err(out_of_range(&format!("{dimension} std_dev"), distribution.std_dev));
            }
        }
        for (id, cluster) in &repr.clusters {
            unit_range(&format!("cluster {id} member_fraction"), cluster.member_fraction)?;
            if cluster.centroid.iter().any(|c| !(-1.0..=1.0).contains(c)) {
                return Err(Error::Validation(format!(
                    "cluster {id} centroid {:?} is outside [-1, 1]",
                    cluster.centroid
                )));
            }
        }
        for topic in &repr.dominant_topics {
            unit_range(&format!("topic {}", topic.topic_id), topic.confidence)?;
        }
        if let Some(quality) = &repr.discussion_quality {
            for (name, value) in [
                ("civility", quality.civility),
                ("constructiveness", quality.constructiveness),
                ("viewpoint_diversity", quality.viewpoint_diversity),
                ("engagement_quality", quality.engagement_quality),
                ("overall", quality.overall),
                ("quality confidence", quality.confidence),
                ("sentiment_coverage", quality.sentiment_coverage),
            ] {
                unit_range(name, value)?;
            }
        }

        Ok(Self {
            profile_id: repr.profile_id,
            subreddit: repr.subreddit,
            window,
            generated_at: repr.generated_at,
            sample_size: repr.sample_size,
            dimensions: repr.dimensions,
            diversity_index: repr.diversity_index,
            clusters: repr.clusters,
            dominant_topics: repr.dominant_topics,
            discussion_quality: repr.discussion_quality,
            confidence: repr.confidence,
        })
    }
}

fn out_of_range(field: &str, value: f64) -> Error {
    Error::Validation(format!("{field} {value} is out of range"))
}

fn unit_range(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::{json, Value};

    fn profile(unique_users: usize, days: i64) -> CommunityProfile {
        let end = Utc::now();
        let mut distribution = DimensionDistribution::empty();
        distribution.mean = 0.4;
        distribution.std_dev = 0.3;
        distribution.count = 30;
        CommunityProfile::assemble(ProfileParts {
            subreddit: "r/test".into(),
            window: TimeWindow::new(end - Duration::days(days), end).unwrap(),
            sample_size: SampleSize {
                posts: 30,
                comments: 0,
                unique_users,
                scored_documents: 30,
                rejected_documents: 0,
                outside_window: 0,
            },
            aggregate: CorpusAggregate {
                distributions: Dimension::ALL.iter().map(|d| (*d, distribution.clone())).collect(),
                dominant_topics: vec![TopicMatch {
                    topic_id: "economy".into(),
                    confidence: 0.5,
                }],
                confidence: 0.3,
                scored_documents: 30,
            },
            diversity_index: 0.42,
            clusters: BTreeMap::new(),
            discussion_quality: None,
        })
    }

    fn forged(edit: impl FnOnce(&mut Value)) -> Result<CommunityProfile> {
        let mut value = serde_json::to_value(profile(30, 14)).unwrap();
        edit(&mut value);
        CommunityProfile::from_json(&value.to_string())
    }

    #[test]
    fn test_stored_profile_round_trips() {
        let original = profile(30, 14);
        let restored = CommunityProfile::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(restored, original);
        let via_serde: CommunityProfile =
            serde_json::from_str(&original.to_json().unwrap()).unwrap();
        assert_eq!(via_serde, original);
    }

    #[test]
    fn test_stored_profile_below_user_floor_is_rejected() {
        let err = forged(|v| v["sample_size"]["unique_users"] = json!(2)).unwrap_err();
        assert!(err.is_privacy_violation());
    }

    #[test]
    fn test_stored_profile_with_short_window_is_rejected() {
        let err = forged(|v| v["window"]["start"] = v["window"]["end"].clone()).unwrap_err();
        assert!(err.is_privacy_violation());
    }

    #[test]
    fn test_stored_profile_with_reversed_window_is_rejected() {
        let err = forged(|v| {
            let start = v["window"]["start"].clone();
            v["window"]["start"] = v["window"]["end"].clone();
            v["window"]["end"] = start;
        })
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_stored_profile_with_out_of_range_measures_is_rejected() {
        assert!(forged(|v| v["diversity_index"] = json!(1.5)).unwrap_err().is_validation());
        assert!(forged(|v| v["confidence"] = json!(-0.1)).unwrap_err().is_validation());
        assert!(forged(|v| v["dimensions"]["Economic"]["mean"] = json!(3.0))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_forged_profile_is_rejected_by_plain_serde() {
        let mut value = serde_json::to_value(profile(30, 14)).unwrap();
        value["sample_size"]["unique_users"] = json!(2);
        assert!(serde_json::from_value::<CommunityProfile>(value).is_err());
    }
}
