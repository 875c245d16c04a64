//! Property tests for per-document scoring and the point-set measures.

use proptest::prelude::*;
use std::sync::OnceLock;

use polis_analysis::{
    calculate_political_diversity, identify_political_clusters, Dimension,
    PoliticalAnalysisEngine,
};

fn political_text() -> impl Strategy<Value = String> {
    let words = prop::sample::select(vec![
        "free", "market", "markets", "public", "ownership", "redistribution", "tax", "cuts",
        "traditional", "values", "equality", "liberty", "federal", "government", "local",
        "control", "surveillance", "privacy", "the", "and", "we", "need", "not", "because",
    ]);
    prop::collection::vec(words, 0..40).prop_map(|w| w.join(" "))
}

fn point() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-1.0f64..=1.0)
}

fn engine() -> &'static PoliticalAnalysisEngine {
    static ENGINE: OnceLock<PoliticalAnalysisEngine> = OnceLock::new();
    ENGINE.get_or_init(|| PoliticalAnalysisEngine::with_defaults().unwrap())
}

proptest! {
    #[test]
    fn scores_stay_in_range(text in "\\PC{0,300}") {
        let result = engine().analyze_document(&text);
        for dimension in Dimension::ALL {
            let score = result.score(dimension);
            prop_assert!((-1.0..=1.0).contains(&score.score));
            prop_assert!((0.0..=1.0).contains(&score.confidence));
            prop_assert!(score.evidence.len() <= 5);
        }
        prop_assert!((0.0..=1.0).contains(&result.analysis_quality));
    }

    #[test]
    fn political_vocabulary_stays_in_range_and_is_idempotent(text in political_text()) {
        let engine = engine();
        let first = engine.analyze_document(&text);
        prop_assert_eq!(&first, &engine.analyze_document(&text));

        let topics = engine.detector().detect_topics(&text);
        prop_assert!(topics.len() <= 5);
        prop_assert!(topics.iter().all(|t| (0.15..=1.0).contains(&t.confidence)));
        prop_assert!(topics.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn diversity_is_bounded(points in prop::collection::vec(point(), 0..60)) {
        let weights = vec![1.0; points.len()];
        let diversity = calculate_political_diversity(&points, &weights).unwrap();
        prop_assert!((0.0..=1.0).contains(&diversity));
    }

    #[test]
    fn clusters_cover_every_point(points in prop::collection::vec(point(), 1..60)) {
        let clusters = identify_political_clusters(&points);
        let total: usize = clusters.values().map(|c| c.size).sum();
        prop_assert_eq!(total, points.len());
        let fractions: f64 = clusters.values().map(|c| c.member_fraction).sum();
        prop_assert!((fractions - 1.0).abs() < 1e-9);
    }
}
