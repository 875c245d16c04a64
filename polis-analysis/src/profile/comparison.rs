//! Change between two snapshots of the same community.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use polis_common::{Error, Result};

use super::CommunityProfile;
use crate::types::Dimension;

/// Movement on one axis between two profiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionShift {
    /// later mean − earlier mean
    pub mean_shift: f64,
    /// later std-dev − earlier std-dev
    pub std_dev_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileComparison {
    pub subreddit: String,
    pub earlier_profile_id: Uuid,
    pub later_profile_id: Uuid,
    /// Days between the ends of the two windows
    pub days_between: i64,
    pub dimension_shifts: BTreeMap<Dimension, DimensionShift>,
    pub diversity_change: f64,
    pub cluster_count_change: i64,
    /// Axis with the largest absolute mean shift; `None` when nothing moved
    pub largest_shift: Option<Dimension>,
    /// The lower of the two profile confidences
    pub confidence: f64,
}

impl ProfileComparison {
    /// Compare two profiles of the same subreddit.
    pub fn between(earlier: &CommunityProfile, later: &CommunityProfile) -> Result<Self> {
        if earlier.subreddit() != later.subreddit() {
            return Err(Error::Validation(format!(
                "cannot compare profiles of different communities: {} vs {}",
                earlier.subreddit(),
                later.subreddit()
            )));
        }

        let dimension_shifts: BTreeMap<Dimension, DimensionShift> = Dimension::ALL
            .iter()
            .map(|d| {
                let a = earlier.dimension(*d);
                let b = later.dimension(*d);
                (
                    *d,
                    DimensionShift {
                        mean_shift: b.mean - a.mean,
                        std_dev_change: b.std_dev - a.std_dev,
                    },
                )
            })
            .collect();

        let mut largest_shift = None;
        let mut largest = 0.0;
        for dimension in Dimension::ALL {
            let shift = dimension_shifts[&dimension].mean_shift.abs();
            if shift > largest {
                largest = shift;
                largest_shift = Some(dimension);
            }
        }

        Ok(Self {
            subreddit: later.subreddit().to_string(),
            earlier_profile_id: earlier.profile_id(),
            later_profile_id: later.profile_id(),
            days_between: (later.window().end - earlier.window().end).num_days(),
            dimension_shifts,
            diversity_change: later.diversity_index() - earlier.diversity_index(),
            cluster_count_change: later.clusters().len() as i64 - earlier.clusters().len() as i64,
            largest_shift,
            confidence: earlier.confidence().min(later.confidence()),
        })
    }

    /// Whether any axis mean moved by more than `threshold`.
    pub fn has_shifted(&self, threshold: f64) -> bool {
        self.dimension_shifts
            .values()
            .any(|s| s.mean_shift.abs() > threshold)
    }
}
