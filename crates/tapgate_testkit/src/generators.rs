//! Property-based generators.

use chrono::NaiveTime;
use proptest::prelude::*;
use tapgate_core::{CachedRule, ControlPointId, HolderId, TimeWindow};

/// Arbitrary byte buffers sized like contactless frames.
pub fn arb_frame_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..64)
}

/// Arbitrary wall-clock times at minute resolution.
pub fn arb_time() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| {
        NaiveTime::from_hms_opt(h, m, 0).expect("hour and minute in range")
    })
}

/// Arbitrary time windows, including midnight-crossing ones.
pub fn arb_time_window() -> impl Strategy<Value = TimeWindow> {
    (arb_time(), arb_time()).prop_map(|(start, end)| TimeWindow::new(start, end))
}

/// Arbitrary day-of-week sets (possibly empty).
pub fn arb_day_set() -> impl Strategy<Value = std::collections::BTreeSet<u8>> {
    proptest::collection::btree_set(0u8..=6, 0..=7)
}

/// Arbitrary cached rules for a fixed holder/control-point pair.
pub fn arb_cached_rule(
    holder: HolderId,
    control_point: ControlPointId,
) -> impl Strategy<Value = CachedRule> {
    (arb_day_set(), arb_time(), arb_time()).prop_map(move |(allowed_days, start, end)| {
        CachedRule {
            holder,
            control_point,
            allowed_days,
            start,
            end,
            last_synced_at: chrono::DateTime::<chrono::Utc>::MIN_UTC,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn window_contains_its_own_start_and_end(window in arb_time_window()) {
            prop_assert!(window.contains(window.start));
            prop_assert!(window.contains(window.end));
        }

        #[test]
        fn crossing_windows_split_the_day(window in arb_time_window(), time in arb_time()) {
            // A window and its mirror cover the whole day (boundaries
            // overlap). Degenerate single-instant windows are the one
            // exception: they cover only their instant.
            prop_assume!(window.start != window.end);
            let mirrored = TimeWindow::new(window.end, window.start);
            prop_assert!(window.contains(time) || mirrored.contains(time));
        }

        #[test]
        fn rule_validation_accepts_generated_days(
            rule in arb_cached_rule(HolderId::new(1), ControlPointId::new(1))
        ) {
            prop_assert!(rule.validate().is_ok());
        }
    }
}
