//! The pure access decision engine.
//!
//! Both entry points are total functions over their inputs: no I/O, no
//! clock, no mutation. All side effects (recording the event, showing
//! the result) belong to the caller.
//!
//! # Rule precedence
//!
//! The first rule that *fully* matches wins. There is no scoring or
//! most-specific-rule resolution; the authority controls ordering by
//! controlling the rule list it hands out.

use crate::event::AccessDecision;
use crate::rule::{AccessRule, CachedRule};
use crate::types::RoleId;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

/// Reason attached to an online grant.
pub const REASON_GRANTED: &str = "within permitted schedule";
/// Reason attached to an online deny with no matching rule.
pub const REASON_DENIED: &str = "outside permitted schedule";
/// Reason attached to an offline grant.
pub const REASON_GRANTED_OFFLINE: &str = "within permitted schedule (offline)";
/// Reason attached to an offline deny with cached rules present.
pub const REASON_DENIED_OFFLINE: &str = "outside permitted schedule (offline)";
/// Reason attached to an offline deny with no cached rules at all.
pub const REASON_NO_CACHED_RULES: &str = "no cached rules (offline)";

/// Evaluates the authoritative rule set for one control point.
///
/// Grants as soon as a single rule matches on all three axes: the role
/// sets intersect, the date window (if any) contains `now`'s date, and
/// the time window (if any) contains `now`'s time. Absence of any full
/// match denies with [`REASON_DENIED`].
#[must_use]
pub fn evaluate(
    rules: &[AccessRule],
    holder_roles: &BTreeSet<RoleId>,
    now: NaiveDateTime,
) -> AccessDecision {
    if rules.iter().any(|rule| rule.matches(holder_roles, now)) {
        AccessDecision::granted(REASON_GRANTED)
    } else {
        AccessDecision::denied(REASON_DENIED)
    }
}

/// Evaluates cached rules for one `(holder, control point)` pair.
///
/// An empty slice denies with [`REASON_NO_CACHED_RULES`]; this is the
/// "offline with nothing synced yet" case and is distinct from a
/// schedule miss. Otherwise the day-of-week check precedes the time
/// check on each rule, and the first rule passing both grants.
#[must_use]
pub fn evaluate_cached(rules: &[CachedRule], now: NaiveDateTime) -> AccessDecision {
    if rules.is_empty() {
        return AccessDecision::denied(REASON_NO_CACHED_RULES);
    }
    if rules.iter().any(|rule| rule.matches(now)) {
        AccessDecision::granted(REASON_GRANTED_OFFLINE)
    } else {
        AccessDecision::denied(REASON_DENIED_OFFLINE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::TimeWindow;
    use crate::types::{ControlPointId, HolderId};
    use chrono::{DateTime, NaiveDate, Utc};

    fn at(date: (i32, u32, u32), h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn roles(ids: &[u64]) -> BTreeSet<RoleId> {
        ids.iter().map(|&id| RoleId::new(id)).collect()
    }

    #[test]
    fn grants_on_simple_window_match() {
        let rule = AccessRule::new(ControlPointId::new(1))
            .with_role(RoleId::new(1))
            .with_time_window(TimeWindow::from_hms(9, 0, 17, 0).unwrap());

        let decision = evaluate(&[rule], &roles(&[1]), at((2025, 3, 10), 10, 0));
        assert!(decision.granted);
        assert_eq!(decision.reason, REASON_GRANTED);
    }

    #[test]
    fn denies_when_no_rule_fully_matches() {
        // One rule matches role but not time, another matches time but
        // not role; neither fully matches.
        let role_only = AccessRule::new(ControlPointId::new(1))
            .with_role(RoleId::new(1))
            .with_time_window(TimeWindow::from_hms(0, 0, 1, 0).unwrap());
        let time_only = AccessRule::new(ControlPointId::new(1))
            .with_role(RoleId::new(9))
            .with_time_window(TimeWindow::from_hms(9, 0, 17, 0).unwrap());

        let decision = evaluate(
            &[role_only, time_only],
            &roles(&[1]),
            at((2025, 3, 10), 10, 0),
        );
        assert!(!decision.granted);
        assert_eq!(decision.reason, REASON_DENIED);
    }

    #[test]
    fn any_single_full_match_wins() {
        let miss = AccessRule::new(ControlPointId::new(1))
            .with_role(RoleId::new(1))
            .with_time_window(TimeWindow::from_hms(0, 0, 1, 0).unwrap());
        let hit = AccessRule::new(ControlPointId::new(1)).with_role(RoleId::new(1));

        let decision = evaluate(&[miss, hit], &roles(&[1]), at((2025, 3, 10), 10, 0));
        assert!(decision.granted);
    }

    #[test]
    fn grants_across_midnight() {
        let rule = AccessRule::new(ControlPointId::new(1))
            .with_role(RoleId::new(1))
            .with_time_window(TimeWindow::from_hms(22, 0, 2, 0).unwrap());

        assert!(evaluate(std::slice::from_ref(&rule), &roles(&[1]), at((2025, 3, 10), 23, 30)).granted);
        assert!(evaluate(std::slice::from_ref(&rule), &roles(&[1]), at((2025, 3, 11), 1, 0)).granted);
        assert!(!evaluate(&[rule], &roles(&[1]), at((2025, 3, 11), 12, 0)).granted);
    }

    fn cached(days: &[u8], start: (u32, u32), end: (u32, u32)) -> CachedRule {
        CachedRule {
            holder: HolderId::new(1),
            control_point: ControlPointId::new(1),
            allowed_days: days.iter().copied().collect(),
            start: chrono::NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: chrono::NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            last_synced_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn no_cached_rules_denies_with_offline_reason() {
        let decision = evaluate_cached(&[], at((2025, 3, 10), 10, 0));
        assert!(!decision.granted);
        assert_eq!(decision.reason, REASON_NO_CACHED_RULES);
        assert!(decision.reason.contains("offline"));
    }

    #[test]
    fn cached_deny_on_wrong_day() {
        // Weekdays only; 2025-03-15 is a Saturday (day 6).
        let rule = cached(&[1, 2, 3, 4, 5], (0, 0), (23, 59));
        let decision = evaluate_cached(&[rule], at((2025, 3, 15), 12, 0));
        assert!(!decision.granted);
        assert!(decision.reason.contains("offline"));
    }

    #[test]
    fn cached_grant_within_window() {
        let rule = cached(&[1, 2, 3, 4, 5], (9, 0), (17, 0));
        // Monday at 10:00
        let decision = evaluate_cached(&[rule], at((2025, 3, 10), 10, 0));
        assert!(decision.granted);
        assert_eq!(decision.reason, REASON_GRANTED_OFFLINE);
    }

    #[test]
    fn cached_exhaustion_denies_with_schedule_reason() {
        let early = cached(&[0, 1, 2, 3, 4, 5, 6], (6, 0), (8, 0));
        let late = cached(&[0, 1, 2, 3, 4, 5, 6], (18, 0), (20, 0));
        let decision = evaluate_cached(&[early, late], at((2025, 3, 10), 12, 0));
        assert!(!decision.granted);
        assert_eq!(decision.reason, REASON_DENIED_OFFLINE);
    }
}
