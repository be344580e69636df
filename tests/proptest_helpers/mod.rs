#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Percent values survive a pixel round trip within this tolerance.
pub const EPS_PERCENT: f64 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Natural media dimensions.
pub fn arb_media_size() -> BoxedStrategy<(f64, f64)> {
    (2u32..=4096, 2u32..=4096)
        .prop_map(|(w, h)| (w as f64, h as f64))
        .boxed()
}

/// A rectangle in percent space that fits inside the media.
pub fn arb_rect_percent() -> BoxedStrategy<(f64, f64, f64, f64, f64)> {
    (0.0f64..90.0, 0.0f64..90.0, 1.0f64..10.0, 1.0f64..10.0, 0.0f64..360.0)
        .prop_map(|(x, y, w, h, rotation)| (x, y, w, h, rotation))
        .boxed()
}

/// Polygon vertices in percent space.
pub fn arb_polygon_percent(max_points: usize) -> BoxedStrategy<Vec<(f64, f64)>> {
    proptest::collection::vec((0.0f64..=100.0, 0.0f64..=100.0), 3..=max_points).boxed()
}

/// Mask-like value sequences: long runs of few distinct values.
pub fn arb_runs(max_runs: usize) -> BoxedStrategy<Vec<u32>> {
    proptest::collection::vec((1usize..50, prop_oneof![Just(0u32), Just(255u32), any::<u32>()]), 0..=max_runs)
        .prop_map(|runs| {
            runs.into_iter()
                .flat_map(|(len, value)| std::iter::repeat(value).take(len))
                .collect()
        })
        .boxed()
}
