//! Political diversity index.
//!
//! ```text
//! c         = mean(points)
//! d_i       = |p_i − c| / √3
//! diversity = clip(amplification × Σ w_i d_i / Σ w_i, 0, 1)
//! ```
//!
//! Weights are one per point (typically the document's analysis quality),
//! never one per dimension.

use polis_common::config::DiversityConfig;
use polis_common::{Error, Result};

/// Distance normalizer: the diagonal of the unit cube.
const MAX_DISTANCE: f64 = 1.732_050_807_568_877_2;

#[derive(Debug, Clone, Default)]
pub struct DiversityCalculator {
    config: DiversityConfig,
}

impl DiversityCalculator {
    pub fn new(config: DiversityConfig) -> Self {
        Self { config }
    }

    /// Diversity of `points`, weighting each point by the matching entry of `weights`.
    ///
    /// Returns 0.0 for fewer than the minimum number of points and when every
    /// weight is zero. A length mismatch, a negative or non-finite weight, or a
    /// non-finite coordinate is a [`Error::Validation`].
    pub fn calculate(&self, points: &[[f64; 3]], weights: &[f64]) -> Result<f64> {
        if points.len() != weights.len() {
            return Err(Error::Validation(format!(
                "diversity needs one weight per point: {} weights for {} points",
                weights.len(),
                points.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(Error::Validation(format!(
                "diversity weights must be finite and non-negative, got {w}"
            )));
        }
        if points.iter().flatten().any(|c| !c.is_finite()) {
            return Err(Error::Validation(
                "diversity point has a non-finite coordinate".to_string(),
            ));
        }

        if points.len() < self.config.min_points {
            return Ok(0.0);
        }
        let weight_sum: f64 = weights.iter().sum();
        if weight_sum <= 0.0 {
            return Ok(0.0);
        }

        let centroid = centroid(points);
        let weighted: f64 = points
            .iter()
            .zip(weights)
            .map(|(p, w)| w * distance(p, &centroid) / MAX_DISTANCE)
            .sum();

        Ok((self.config.amplification * weighted / weight_sum).clamp(0.0, 1.0))
    }
}

/// Diversity with the default parameters.
pub fn calculate_political_diversity(points: &[[f64; 3]], weights: &[f64]) -> Result<f64> {
    DiversityCalculator::default().calculate(points, weights)
}

/// Mean of `points`, accumulated as offsets from the first point so that
/// identical points yield exactly that point.
pub(crate) fn centroid(points: &[[f64; 3]]) -> [f64; 3] {
    let Some(origin) = points.first() else {
        return [0.0; 3];
    };
    let mut offset = [0.0; 3];
    for p in points {
        for ((acc, v), o) in offset.iter_mut().zip(p).zip(origin) {
            *acc += v - o;
        }
    }
    let n = points.len() as f64;
    [
        origin[0] + offset[0] / n,
        origin[1] + offset[1] / n,
        origin[2] + offset[2] / n,
    ]
}

pub(crate) fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    squared_distance(a, b).sqrt()
}

pub(crate) fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners() -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    points.push([x, y, z]);
                }
            }
        }
        points
    }

    #[test]
    fn test_identical_points_have_zero_diversity() {
        let points = vec![[0.3, -0.2, 0.8]; 12];
        let weights = vec![1.0; 12];
        assert_eq!(calculate_political_diversity(&points, &weights).unwrap(), 0.0);
    }

    #[test]
    fn test_cube_corners_are_maximally_diverse() {
        let points: Vec<[f64; 3]> = corners().into_iter().cycle().take(16).collect();
        let weights = vec![1.0; 16];
        let diversity = calculate_political_diversity(&points, &weights).unwrap();
        assert!(diversity >= 0.8);
        assert_eq!(diversity, 1.0);
    }

    #[test]
    fn test_weight_length_mismatch_is_rejected() {
        let points = vec![[0.0, 0.0, 0.0]; 12];
        // one weight per dimension is the classic mistake
        let err = calculate_political_diversity(&points, &[1.0, 1.0, 1.0]).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("3 weights for 12 points"));
    }

    #[test]
    fn test_small_samples_return_zero() {
        let points: Vec<[f64; 3]> = corners();
        assert_eq!(calculate_political_diversity(&points, &[1.0; 8]).unwrap(), 0.0);
    }

    #[test]
    fn test_weights_shift_the_mean_distance() {
        // ten points on the centroid and two far away
        let mut points = vec![[0.0, 0.0, 0.0]; 10];
        points.push([1.0, 0.0, 0.0]);
        points.push([-1.0, 0.0, 0.0]);
        let calc = DiversityCalculator::default();

        let even = calc.calculate(&points, &[1.0; 12]).unwrap();
        let mut heavy = vec![0.1; 10];
        heavy.extend([1.0, 1.0]);
        let outliers = calc.calculate(&points, &heavy).unwrap();
        assert!(outliers > even);

        let expected_even = 1.5 * (2.0 / MAX_DISTANCE) / 12.0;
        assert!((even - expected_even).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_weights() {
        let points = vec![[0.0, 0.0, 0.0]; 10];
        let mut weights = vec![1.0; 10];
        weights[3] = -0.5;
        assert!(calculate_political_diversity(&points, &weights).is_err());
        weights[3] = f64::NAN;
        assert!(calculate_political_diversity(&points, &weights).is_err());
        assert_eq!(calculate_political_diversity(&points, &[0.0; 10]).unwrap(), 0.0);
    }
}
