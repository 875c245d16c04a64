//! Discretization of axis positions into named buckets.
//!
//! Four ascending boundaries split [-1, 1] into five buckets. A position on a
//! boundary belongs to the bucket above it, so with the default boundaries
//! -0.2 is "Mixed Economy" and 0.2 is "Moderately Market".

use crate::types::Dimension;

/// Histogram edges for profile distributions. Fixed regardless of label overrides.
pub const HISTOGRAM_BOUNDARIES: [f64; 4] = [-0.6, -0.2, 0.2, 0.6];

/// Number of buckets a position is discretized into.
pub const BUCKET_COUNT: usize = 5;

/// Bucket index in `0..5` for a position.
pub fn bucket_index(score: f64, boundaries: &[f64; 4]) -> usize {
    boundaries.iter().filter(|b| score >= **b).count()
}

/// Full bucket names, from the negative pole to the positive pole.
pub fn bucket_names(dimension: Dimension) -> [&'static str; BUCKET_COUNT] {
    match dimension {
        Dimension::Economic => [
            "Strongly Planned",
            "Moderately Planned",
            "Mixed Economy",
            "Moderately Market",
            "Strongly Market",
        ],
        Dimension::Social => [
            "Strongly Traditional",
            "Moderately Traditional",
            "Moderate",
            "Moderately Progressive",
            "Strongly Progressive",
        ],
        Dimension::Governance => [
            "Strongly Centralized",
            "Moderately Centralized",
            "Balanced",
            "Moderately Decentralized",
            "Strongly Decentralized",
        ],
    }
}

/// Compact bucket names used in composite cluster labels.
pub fn short_bucket_names(dimension: Dimension) -> [&'static str; BUCKET_COUNT] {
    match dimension {
        Dimension::Economic => ["Planned", "Planned-leaning", "Mixed", "Market-leaning", "Market"],
        Dimension::Social => [
            "Traditional",
            "Traditional-leaning",
            "Moderate",
            "Progressive-leaning",
            "Progressive",
        ],
        Dimension::Governance => [
            "Centralized",
            "Centralized-leaning",
            "Balanced",
            "Decentralized-leaning",
            "Decentralized",
        ],
    }
}

/// Label for a position on one axis.
pub fn label_for(dimension: Dimension, score: f64, boundaries: &[f64; 4]) -> &'static str {
    bucket_names(dimension)[bucket_index(score, boundaries)]
}

/// Composite label for a 3-d position, e.g. "Market-leaning / Progressive / Decentralized".
pub fn composite_label(point: &[f64; 3], boundaries: &[f64; 4]) -> String {
    Dimension::ALL
        .iter()
        .map(|d| short_bucket_names(*d)[bucket_index(point[d.index()], boundaries)])
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const B: [f64; 4] = HISTOGRAM_BOUNDARIES;

    #[test_case(-1.0, 0 ; "lower edge")]
    #[test_case(-0.61, 0 ; "just below first boundary")]
    #[test_case(-0.6, 1 ; "on first boundary")]
    #[test_case(-0.2, 2 ; "on second boundary")]
    #[test_case(0.0, 2 ; "center")]
    #[test_case(0.2, 3 ; "on third boundary")]
    #[test_case(0.6, 4 ; "on fourth boundary")]
    #[test_case(1.0, 4 ; "upper edge")]
    fn test_bucket_index(score: f64, expected: usize) {
        assert_eq!(bucket_index(score, &B), expected);
    }

    #[test_case(Dimension::Economic, 0.9, "Strongly Market")]
    #[test_case(Dimension::Economic, -0.3, "Moderately Planned")]
    #[test_case(Dimension::Social, 0.0, "Moderate")]
    #[test_case(Dimension::Social, 0.4, "Moderately Progressive")]
    #[test_case(Dimension::Governance, -0.7, "Strongly Centralized")]
    fn test_labels(dimension: Dimension, score: f64, expected: &str) {
        assert_eq!(label_for(dimension, score, &B), expected);
    }

    #[test]
    fn test_composite_label() {
        assert_eq!(
            composite_label(&[0.4, 0.8, 0.9], &B),
            "Market-leaning / Progressive / Decentralized"
        );
        assert_eq!(composite_label(&[0.0, 0.0, 0.0], &B), "Mixed / Moderate / Balanced");
    }
}
