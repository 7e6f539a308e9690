/*
 * proptest.rs
 *
 * property-based tests for the interval parser/formatter.
 * generates thousands of inputs to find edge cases.
 */

use proptest::prelude::*;

use supervone::interval::{format, parse, Interval};

/* ============================================================================
 * Interval Parsing Properties
 * ============================================================================ */

/* valid interval strings always parse successfully, for every suffix */
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn interval_valid_milliseconds_parse(ms in 0u64..1_000_000_000) {
        let s = ms.to_string();
        let i = parse(&s).expect("no-suffix interval should parse");
        prop_assert_eq!(i.as_millis(), ms);
    }

    #[test]
    fn interval_valid_seconds_parse(secs in 0u64..1_000_000) {
        let s = format!("{secs}s");
        let i = parse(&s).expect("valid seconds should parse");
        prop_assert_eq!(i.as_millis(), secs * 1_000);
    }

    #[test]
    fn interval_valid_minutes_parse(mins in 0u64..100_000) {
        let s = format!("{mins}m");
        let i = parse(&s).expect("valid minutes should parse");
        prop_assert_eq!(i.as_millis(), mins * 60_000);
    }

    #[test]
    fn interval_valid_hours_parse(hours in 0u64..10_000) {
        let s = format!("{hours}h");
        let i = parse(&s).expect("valid hours should parse");
        prop_assert_eq!(i.as_millis(), hours * 3_600_000);
    }

    #[test]
    fn interval_valid_days_parse(days in 0u64..1_000) {
        let s = format!("{days}d");
        let i = parse(&s).expect("valid days should parse");
        prop_assert_eq!(i.as_millis(), days * 86_400_000);
    }
}

/* round-trip: format() breaks a duration into space-separated `<n><suffix>`
 * tokens (one per unit, largest first); each such token is itself valid
 * `parse()` input (spec §4.1's grammar is exactly "digits + one suffix
 * char"), so summing `parse(token)` back over every token must reproduce
 * the original value. This holds for every suffix in {s, m, h, d} - the
 * one token format() ever emits that parse() can't read back is the
 * sub-second "<ms>ms" form, a single-token case covered separately below
 * and by interval.rs's own `parse_rejects_unknown_suffix` unit test. */
fn round_trip_via_tokens(ms: u64) -> u64 {
    format(Interval::from_millis(ms))
        .split_whitespace()
        .map(|token| parse(token).unwrap().as_millis())
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn interval_round_trips_through_seconds(secs in 1u64..1_000_000) {
        prop_assert_eq!(round_trip_via_tokens(secs * 1_000), secs * 1_000);
    }

    #[test]
    fn interval_round_trips_through_minutes(mins in 1u64..100_000) {
        prop_assert_eq!(round_trip_via_tokens(mins * 60_000), mins * 60_000);
    }

    #[test]
    fn interval_round_trips_through_hours(hours in 1u64..10_000) {
        prop_assert_eq!(round_trip_via_tokens(hours * 3_600_000), hours * 3_600_000);
    }

    #[test]
    fn interval_round_trips_through_days(days in 1u64..1_000) {
        prop_assert_eq!(round_trip_via_tokens(days * 86_400_000), days * 86_400_000);
    }
}

/* ordering: if a > b numerically (same unit), then parse(a) >= parse(b) */
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn interval_ordering_preserved(a in 0u64..100_000, b in 0u64..100_000) {
        let ia = parse(&format!("{a}s")).unwrap();
        let ib = parse(&format!("{b}s")).unwrap();
        if a > b {
            prop_assert!(ia >= ib);
        } else if a < b {
            prop_assert!(ia <= ib);
        } else {
            prop_assert_eq!(ia, ib);
        }
    }
}

/* invalid suffixes always error */
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn interval_invalid_suffix_errors(
        num in 1u64..1000,
        suffix in "[a-z&&[^smhd]]{1,3}"
    ) {
        let s = format!("{num}{suffix}");
        prop_assert!(parse(&s).is_err());
    }
}

/* missing leading digits always errors */
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn interval_missing_digits_errors(suffix in prop::sample::select(vec!["s", "m", "h", "d", ""])) {
        prop_assume!(!suffix.is_empty());
        prop_assert!(parse(suffix).is_err());
    }
}

/* ============================================================================
 * Formatting Properties
 * ============================================================================ */

/* anything under one second formats as "<n>ms" */
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn format_sub_second_is_milliseconds(ms in 0u64..1_000) {
        let s = format(Interval::from_millis(ms));
        prop_assert_eq!(s, format!("{ms}ms"));
    }
}

/* anything at or above one second never contains "ms" */
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn format_at_or_above_one_second_has_no_ms_suffix(secs in 1u64..1_000_000) {
        let s = format(Interval::from_millis(secs * 1_000));
        prop_assert!(!s.contains("ms"));
        prop_assert!(s.ends_with('s'));
    }
}
