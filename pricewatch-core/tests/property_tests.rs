//! Property tests for feature and alert invariants.
//!
//! Uses proptest to verify:
//! 1. Feature length: n bars (n ≥ 10) yield n - 9 fully defined rows
//! 2. Label purity: the label agrees with the return and the threshold
//! 3. Registry order: list_active is insertion order after cancellations
//! 4. At-most-once firing: repeated cycles never fire a rule twice

use pricewatch_core::alerts::{AlertEvaluator, AlertRegistry};
use pricewatch_core::events::RecordingSink;
use pricewatch_core::features::{FeatureBuilder, FeatureConfig, Movement};
use pricewatch_core::feed::{bars_from_closes, MemoryFeed};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0),
        min..max,
    )
}

fn arb_threshold() -> impl Strategy<Value = f64> {
    (0.0..0.05_f64).prop_map(|t| (t * 10_000.0).round() / 10_000.0)
}

// ── 1. Feature length ────────────────────────────────────────────────

proptest! {
    #[test]
    fn feature_rows_are_n_minus_warmup(closes in arb_closes(10, 120)) {
        let bars = bars_from_closes(&closes);
        let rows = FeatureBuilder::default().build(&bars);

        prop_assert_eq!(rows.len(), closes.len() - 9);
        for row in &rows {
            prop_assert!(row.daily_return.is_finite());
            prop_assert!(row.ma_short.is_finite());
            prop_assert!(row.ma_long.is_finite());
        }
        // Rows keep bar order and line up with the tail of the series.
        prop_assert_eq!(rows[0].timestamp, bars[9].timestamp);
        prop_assert_eq!(rows.last().map(|r| r.timestamp), bars.last().map(|b| b.timestamp));
    }

    #[test]
    fn fewer_than_ten_bars_yield_nothing(closes in arb_closes(0, 10)) {
        let rows = FeatureBuilder::default().build(&bars_from_closes(&closes));
        prop_assert!(rows.is_empty());
    }
}

// ── 2. Label purity ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn label_matches_return_and_threshold(
        closes in arb_closes(10, 80),
        threshold in arb_threshold(),
    ) {
        let builder = FeatureBuilder::new(FeatureConfig { threshold, ..Default::default() });
        for row in builder.build(&bars_from_closes(&closes)) {
            let r = row.daily_return;
            let expected = if r > threshold {
                Movement::Up
            } else if r < -threshold {
                Movement::Down
            } else {
                Movement::Sideways
            };
            prop_assert_eq!(row.movement_label, expected);
        }
    }

    #[test]
    fn exact_threshold_is_sideways(threshold in arb_threshold()) {
        prop_assert_eq!(Movement::from_return(threshold, threshold), Movement::Sideways);
        prop_assert_eq!(Movement::from_return(-threshold, threshold), Movement::Sideways);
    }
}

// ── 3. Registry order ────────────────────────────────────────────────

proptest! {
    #[test]
    fn list_active_is_insertion_order(
        targets in prop::collection::vec(0.0..500.0_f64, 1..30),
        cancel_mask in prop::collection::vec(any::<bool>(), 30),
    ) {
        let registry = AlertRegistry::new();
        let added: Vec<_> = targets
            .iter()
            .map(|t| registry.add("SPY", *t).unwrap())
            .collect();

        let mut expected = Vec::new();
        for (rule, cancel) in added.into_iter().zip(cancel_mask) {
            if cancel {
                registry.cancel(rule.id).unwrap();
            } else {
                expected.push(rule);
            }
        }
        prop_assert_eq!(registry.list_active(), expected);
    }
}

// ── 4. At-most-once firing ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_rule_fires_twice(
        prices in arb_closes(1, 12),
        targets in prop::collection::vec(1.0..1000.0_f64, 1..12),
    ) {
        let feed = Arc::new(MemoryFeed::new());
        let registry = Arc::new(AlertRegistry::new());
        let sink = Arc::new(RecordingSink::new());
        let evaluator = AlertEvaluator::new(registry.clone(), feed.clone(), sink.clone());
        for t in &targets {
            registry.add("SPY", *t).unwrap();
        }

        for price in &prices {
            feed.push_close("SPY", *price);
            evaluator.evaluate_once();
        }

        let fired = sink.fired();
        let unique: HashSet<_> = fired.iter().map(|e| e.rule.id).collect();
        prop_assert_eq!(unique.len(), fired.len());
        prop_assert_eq!(fired.len() + registry.len(), targets.len());

        // A rule fires iff some observed price reached it.
        let max_price = prices.iter().cloned().fold(f64::MIN, f64::max);
        for event in &fired {
            prop_assert!(event.observed_price >= event.rule.target_price);
        }
        for rule in registry.list_active() {
            prop_assert!(rule.target_price > max_price);
        }
    }
}
