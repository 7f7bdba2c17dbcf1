//! Property-based tests for vlog using proptest

use proptest::prelude::*;
use vlog::prelude::*;
use vlog::{LevelTable, RateSampler};

fn any_level() -> impl Strategy<Value = LogLevel> {
    (0..10i32).prop_map(|rank| LogLevel::from_rank(rank).expect("rank in range"))
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Both the short and long spellings parse back to the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);

        let lower: LogLevel = level.to_str().to_lowercase().parse().unwrap();
        prop_assert_eq!(level, lower);
    }

    /// Enum ordering agrees with rank ordering
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a <= b, a.rank() <= b.rank());
        prop_assert_eq!(a.cmp(&b), a.rank().cmp(&b.rank()));
    }
}

// ============================================================================
// Level Table Tests
// ============================================================================

proptest! {
    /// A level is loggable iff its rank does not exceed the threshold
    #[test]
    fn test_loggable_iff_rank_within_threshold(level in any_level(), threshold in -3i32..14) {
        let table = LevelTable::new(threshold);
        prop_assert_eq!(table.is_loggable(level, ""), level.rank() <= threshold);
    }

    /// An override replaces the global threshold for its component only
    #[test]
    fn test_component_override_replaces_global(
        level in any_level(),
        global in 0i32..10,
        component in 0i32..10,
    ) {
        let table = LevelTable::new(global);
        table.set_component_level("net", component);

        prop_assert_eq!(table.is_loggable(level, "net"), level.rank() <= component);
        prop_assert_eq!(table.is_loggable(level, "db"), level.rank() <= global);
        prop_assert_eq!(table.is_loggable(level, ""), level.rank() <= global);
    }
}

// ============================================================================
// Sampler Tests
// ============================================================================

proptest! {
    /// With rate n, exactly calls n, 2n, 3n, ... are emitted
    #[test]
    fn test_sampler_emits_every_nth(rate in 1i64..20, calls in 0usize..200) {
        let sampler = RateSampler::new();
        sampler.set_rate("key", rate);

        let emitted: Vec<usize> = (1..=calls).filter(|_| sampler.should_log("key")).collect();
        let expected: Vec<usize> = (1..=calls).filter(|i| i % rate as usize == 0).collect();
        prop_assert_eq!(emitted, expected);
    }

    /// Non-positive rates behave like rate 1
    #[test]
    fn test_sampler_clamps_rate(rate in -50i64..=1, calls in 1usize..50) {
        let sampler = RateSampler::new();
        sampler.set_rate("key", rate);
        prop_assert!((0..calls).all(|_| sampler.should_log("key")));
        prop_assert_eq!(sampler.rate("key"), Some(1));
    }

    /// Keys advance independently
    #[test]
    fn test_sampler_keys_are_independent(rate in 2i64..10, noise in 0usize..30) {
        let sampler = RateSampler::new();
        sampler.set_rate("a", rate);
        sampler.set_rate("b", rate);

        for _ in 0..noise {
            sampler.should_log("b");
        }
        let first_emit = (1..=rate as usize).find(|_| sampler.should_log("a"));
        prop_assert_eq!(first_emit, Some(rate as usize));
    }
}

// ============================================================================
// Field Merge Tests
// ============================================================================

proptest! {
    /// After a merge, every key of the overlay carries the overlay's value
    /// and every other key keeps the base value
    #[test]
    fn test_merge_overlay_wins(
        base in prop::collection::btree_map("[a-e]", any::<i64>(), 0..5),
        overlay in prop::collection::btree_map("[a-e]", any::<i64>(), 0..5),
    ) {
        let mut merged: LogContext = base.iter().map(|(k, v)| (k.clone(), FieldValue::from(*v))).collect();
        let extra: LogContext = overlay.iter().map(|(k, v)| (k.clone(), FieldValue::from(*v))).collect();
        merged.merge(&extra);

        for (key, value) in &overlay {
            prop_assert_eq!(merged.get(key), Some(&FieldValue::from(*value)));
        }
        for (key, value) in base.iter().filter(|(k, _)| !overlay.contains_key(*k)) {
            prop_assert_eq!(merged.get(key), Some(&FieldValue::from(*value)));
        }
        let union: std::collections::BTreeSet<&String> = base.keys().chain(overlay.keys()).collect();
        prop_assert_eq!(merged.len(), union.len());
    }

    /// Messages always render on exactly one line
    #[test]
    fn test_text_output_is_single_line(message in "[ -~\n\r\t]{0,80}") {
        let entry = LogEntry::new(LogLevel::Info, message);
        let line = OutputFormat::Text.format(&entry, &TimestampFormat::default()).unwrap();
        prop_assert!(line.ends_with('\n'));
        prop_assert_eq!(line.matches('\n').count(), 1);
        prop_assert!(!line.contains('\r'));
    }
}
