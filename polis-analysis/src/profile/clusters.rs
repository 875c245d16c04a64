//! Political sub-group identification.
//!
//! Points are partitioned with k-means (k-means++ seeding from a fixed seed),
//! trying every k in the configured range and keeping the one with the best
//! mean silhouette. Equal silhouettes keep the smaller k. Clusters under the
//! minimum size are then folded into their nearest larger neighbour, and ids
//! are assigned by descending size.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use polis_common::config::{ClusteringConfig, DimensionConfig};
use polis_common::{Error, Result};

use super::diversity::{centroid, distance, squared_distance};
use crate::dimensions::composite_label;

/// Points evaluated when scoring a candidate k on large corpora.
const SILHOUETTE_SAMPLE: usize = 1_000;

/// Tolerance for comparing silhouette scores.
const SCORE_EPSILON: f64 = 1e-12;

/// A political sub-group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Mean position, one coordinate per dimension
    pub centroid: [f64; 3],
    pub size: usize,
    /// Composite label, e.g. "Market-leaning / Progressive / Decentralized"
    pub label: String,
    /// Share of all clustered points
    pub member_fraction: f64,
}

#[derive(Debug, Clone)]
pub struct ClusterIdentifier {
    config: ClusteringConfig,
    label_boundaries: [f64; 4],
}

impl Default for ClusterIdentifier {
    fn default() -> Self {
        Self::new(ClusteringConfig::default(), DimensionConfig::default().label_boundaries)
    }
}

impl ClusterIdentifier {
    pub fn new(config: ClusteringConfig, label_boundaries: [f64; 4]) -> Self {
        Self {
            config,
            label_boundaries,
        }
    }

    /// Partition `points` into labelled clusters keyed by id (0 is the largest).
    ///
    /// Fewer points than the configured minimum, or only one distinct point,
    /// gives a single cluster holding everything. An empty input gives an
    /// empty map.
    pub fn identify(&self, points: &[[f64; 3]]) -> BTreeMap<usize, Cluster> {
        if points.is_empty() {
            return BTreeMap::new();
        }
        let assignments = self.partition(points);
        self.build_clusters(points, &assignments)
    }

    /// Cluster index per point, before labelling.
    pub fn partition(&self, points: &[[f64; 3]]) -> Vec<usize> {
        let n = points.len();
        let distinct = distinct_count(points);
        if n < self.config.min_points || distinct < 2 {
            debug!(points = n, distinct, "Degenerate input; using a single cluster");
            return vec![0; n];
        }

        let k_max = self.config.max_k.min(distinct);
        let mut best: Option<(usize, f64, Vec<usize>)> = None;
        for k in self.config.min_k.max(2)..=k_max {
            let assignments = match self.kmeans(points, k) {
                Ok(a) => a,
                Err(e) => {
                    warn!(k, error = %e, "Skipping cluster count");
                    continue;
                }
            };
            let score = silhouette(points, &assignments);
            debug!(k, silhouette = score, "Scored cluster count");
            if best.as_ref().map_or(true, |(_, s, _)| score > s + SCORE_EPSILON) {
                best = Some((k, score, assignments));
            }
        }

        let Some((k, score, mut assignments)) = best else {
            warn!(points = n, "No cluster count could be fitted; using a single cluster");
            return vec![0; n];
        };
        debug!(k, silhouette = score, "Selected cluster count");

        self.merge_small_clusters(points, &mut assignments);
        relabel_by_size(points, &assignments)
    }

    /// k-means++ seeding followed by Lloyd iterations.
    fn kmeans(&self, points: &[[f64; 3]], k: usize) -> Result<Vec<usize>> {
        let n = points.len();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut centroids = vec![points[rng.gen_range(0..n)]];
        let mut nearest_sq: Vec<f64> = points
            .iter()
            .map(|p| squared_distance(p, &centroids[0]))
            .collect();

        while centroids.len() < k {
            let total: f64 = nearest_sq.iter().sum();
            if total <= 0.0 {
                return Err(Error::Computation(format!(
                    "only {} distinct centroids available for k={k}",
                    centroids.len()
                )));
            }
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = None;
            for (i, d) in nearest_sq.iter().enumerate() {
                if *d <= 0.0 {
                    continue;
                }
                chosen = Some(i);
                target -= d;
                if target <= 0.0 {
                    break;
                }
            }
            let Some(chosen) = chosen else {
                return Err(Error::Computation(format!("seeding failed for k={k}")));
            };
            let next = points[chosen];
            for (d, p) in nearest_sq.iter_mut().zip(points) {
                *d = d.min(squared_distance(p, &next));
            }
            centroids.push(next);
        }

        let mut assignments = vec![usize::MAX; n];
        for _ in 0..self.config.max_iterations {
            let mut changed = false;
            for (slot, p) in assignments.iter_mut().zip(points) {
                let c = nearest_centroid(p, &centroids);
                if *slot != c {
                    *slot = c;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            for (j, c) in centroids.iter_mut().enumerate() {
                let members: Vec<[f64; 3]> = points
                    .iter()
                    .zip(&assignments)
                    .filter(|(_, a)| **a == j)
                    .map(|(p, _)| *p)
                    .collect();
                // An emptied cluster keeps its previous centroid
                if !members.is_empty() {
                    *c = centroid(&members);
                }
            }
        }

        Ok(assignments)
    }

    /// Fold every cluster below the minimum size into its nearest larger
    /// cluster, smallest first. With no larger cluster it joins the nearest one.
    fn merge_small_clusters(&self, points: &[[f64; 3]], assignments: &mut [usize]) {
        loop {
            let groups = group(points, assignments);
            if groups.len() <= 1 {
                return;
            }
            let Some((&small, small_group)) = groups
                .iter()
                .filter(|(_, g)| g.size < self.config.min_cluster_size)
                .min_by(|a, b| a.1.size.cmp(&b.1.size).then(a.0.cmp(b.0)))
            else {
                return;
            };

            let nearest = |larger_only: bool| {
                groups
                    .iter()
                    .filter(|(id, g)| **id != small && (!larger_only || g.size > small_group.size))
                    .map(|(id, g)| (*id, distance(&g.centroid, &small_group.centroid)))
                    .min_by(|a, b| {
                        a.1.partial_cmp(&b.1)
                            .unwrap_or(Ordering::Equal)
                            .then(a.0.cmp(&b.0))
                    })
                    .map(|(id, _)| id)
            };
            let Some(target) = nearest(true).or_else(|| nearest(false)) else {
                return;
            };

            debug!(
                from = small,
                into = target,
                size = small_group.size,
                "Merging undersized cluster"
            );
            for a in assignments.iter_mut().filter(|a| **a == small) {
                *a = target;
            }
        }
    }

    fn build_clusters(
        &self,
        points: &[[f64; 3]],
        assignments: &[usize],
    ) -> BTreeMap<usize, Cluster> {
        let n = points.len() as f64;
        group(points, assignments)
            .into_iter()
            .map(|(id, g)| {
                let cluster = Cluster {
                    label: composite_label(&g.centroid, &self.label_boundaries),
                    centroid: g.centroid,
                    size: g.size,
                    member_fraction: g.size as f64 / n,
                };
                (id, cluster)
            })
            .collect()
    }
}

/// Clusters with the default parameters.
pub fn identify_political_clusters(points: &[[f64; 3]]) -> BTreeMap<usize, Cluster> {
    ClusterIdentifier::default().identify(points)
}

/// Mean silhouette coefficient of a partition, in [-1, 1].
///
/// Points in singleton clusters score 0; a partition with fewer than two
/// clusters scores 0.
pub fn silhouette_score(points: &[[f64; 3]], assignments: &[usize]) -> Result<f64> {
    if points.len() != assignments.len() {
        return Err(Error::Validation(format!(
            "silhouette needs one assignment per point: {} assignments for {} points",
            assignments.len(),
            points.len()
        )));
    }
    Ok(silhouette(points, assignments))
}

fn silhouette(points: &[[f64; 3]], assignments: &[usize]) -> f64 {
    let n = points.len();
    let Some(&max_id) = assignments.iter().max() else {
        return 0.0;
    };
    let mut sizes = vec![0usize; max_id + 1];
    for a in assignments {
        sizes[*a] += 1;
    }
    if sizes.iter().filter(|s| **s > 0).count() < 2 {
        return 0.0;
    }

    let stride = n.div_ceil(SILHOUETTE_SAMPLE).max(1);
    let mut total = 0.0;
    let mut evaluated = 0usize;
    let mut sums = vec![0.0; max_id + 1];

    for i in (0..n).step_by(stride) {
        evaluated += 1;
        let own = assignments[i];
        if sizes[own] < 2 {
            continue;
        }
        sums.iter_mut().for_each(|s| *s = 0.0);
        for (p, a) in points.iter().zip(assignments) {
            sums[*a] += distance(&points[i], p);
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = sums
            .iter()
            .zip(&sizes)
            .enumerate()
            .filter(|(j, (_, size))| *j != own && **size > 0)
            .map(|(_, (sum, size))| sum / *size as f64)
            .fold(f64::INFINITY, f64::min);

        let max = a.max(b);
        if max > SCORE_EPSILON && b.is_finite() {
            total += ((b - a) / max).clamp(-1.0, 1.0);
        }
    }

    if evaluated == 0 {
        0.0
    } else {
        total / evaluated as f64
    }
}

fn nearest_centroid(point: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (j, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_d {
            best = j;
            best_d = d;
        }
    }
    best
}

fn distinct_count(points: &[[f64; 3]]) -> usize {
    points
        .iter()
        .map(|p| p.map(f64::to_bits))
        .collect::<BTreeSet<_>>()
        .len()
}

#[derive(Debug, Clone)]
struct Group {
    size: usize,
    centroid: [f64; 3],
}

fn group(points: &[[f64; 3]], assignments: &[usize]) -> BTreeMap<usize, Group> {
    let mut members: BTreeMap<usize, Vec<[f64; 3]>> = BTreeMap::new();
    for (p, a) in points.iter().zip(assignments) {
        members.entry(*a).or_default().push(*p);
    }
    members
        .into_iter()
        .map(|(id, m)| {
            (
                id,
                Group {
                    size: m.len(),
                    centroid: centroid(&m),
                },
            )
        })
        .collect()
}

/// Renumber clusters 0.. by descending size; equal sizes order by centroid.
fn relabel_by_size(points: &[[f64; 3]], assignments: &[usize]) -> Vec<usize> {
    let mut groups: Vec<(usize, Group)> = group(points, assignments).into_iter().collect();
    groups.sort_by(|(ia, a), (ib, b)| {
        b.size
            .cmp(&a.size)
            .then_with(|| {
                a.centroid
                    .partial_cmp(&b.centroid)
                    .unwrap_or(Ordering::Equal)
            })
            .then(ia.cmp(ib))
    });
    let mapping: BTreeMap<usize, usize> = groups
        .iter()
        .enumerate()
        .map(|(new, (old, _))| (*old, new))
        .collect();
    assignments.iter().map(|a| mapping[a]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: [f64; 3], n: usize) -> Vec<[f64; 3]> {
        (0..n)
            .map(|i| {
                [
                    center[0] + 0.01 * (i % 5) as f64,
                    center[1] + 0.01 * (i / 5) as f64,
                    center[2],
                ]
            })
            .collect()
    }

    #[test]
    fn test_repeated_point_is_one_cluster() {
        let points = vec![[0.4, -0.1, 0.7]; 30];
        let clusters = identify_political_clusters(&points);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[&0].size, 30);
        assert_eq!(clusters[&0].member_fraction, 1.0);
        assert_eq!(clusters[&0].centroid, [0.4, -0.1, 0.7]);
    }

    #[test]
    fn test_small_input_is_one_cluster() {
        let points = vec![[1.0, 1.0, 1.0], [-1.0, -1.0, -1.0], [0.0, 0.0, 0.0]];
        let clusters = identify_political_clusters(&points);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[&0].size, 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(identify_political_clusters(&[]).is_empty());
    }

    #[test]
    fn test_two_separated_groups() {
        let mut points = blob([0.8, 0.8, 0.8], 20);
        points.extend(blob([-0.8, -0.8, -0.8], 20));
        let clusters = identify_political_clusters(&points);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.values().all(|c| c.size == 20));
        assert!(clusters.values().all(|c| (c.member_fraction - 0.5).abs() < 1e-12));

        let labels: BTreeSet<&str> = clusters.values().map(|c| c.label.as_str()).collect();
        assert!(labels.contains("Market / Progressive / Decentralized"));
        assert!(labels.contains("Planned / Traditional / Centralized"));
    }

    #[test]
    fn test_clustering_is_reproducible() {
        let mut points = blob([0.7, -0.5, 0.1], 25);
        points.extend(blob([-0.6, 0.6, -0.3], 15));
        points.extend(blob([0.0, 0.0, 0.9], 12));
        let identifier = ClusterIdentifier::default();
        assert_eq!(identifier.identify(&points), identifier.identify(&points));
    }

    #[test]
    fn test_undersized_clusters_are_merged() {
        let mut points = blob([0.8, 0.8, 0.0], 20);
        points.extend(blob([-0.8, -0.8, 0.0], 20));
        points.extend(blob([0.8, -0.8, 0.9], 4));
        let clusters = identify_political_clusters(&points);
        assert!(!clusters.is_empty());
        assert!(clusters.values().all(|c| c.size >= 10));
        assert_eq!(clusters.values().map(|c| c.size).sum::<usize>(), 44);
        // ids follow descending size
        let sizes: Vec<usize> = clusters.values().map(|c| c.size).collect();
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_silhouette_score() {
        let mut points = blob([0.8, 0.8, 0.8], 10);
        points.extend(blob([-0.8, -0.8, -0.8], 10));
        let good: Vec<usize> = (0..20).map(|i| i / 10).collect();
        let bad: Vec<usize> = (0..20).map(|i| i % 2).collect();
        assert!(silhouette_score(&points, &good).unwrap() > 0.9);
        assert!(silhouette_score(&points, &bad).unwrap() < 0.1);
        assert_eq!(silhouette_score(&points, &[0; 20]).unwrap(), 0.0);
        assert!(silhouette_score(&points, &[0; 3]).unwrap_err().is_validation());
    }
}
