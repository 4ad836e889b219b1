//! Test fixtures.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use parking_lot::RwLock;
use std::path::Path;
use std::time::Duration;
use tapgate_core::{
    CachedRule, Clock, ControlPointId, CredentialId, HolderId, Identity,
};
use tapgate_store::LocalStore;
use tempfile::TempDir;

/// A clock that only moves when told to.
///
/// `now_local` mirrors `now` (the fixture pretends the device wall
/// clock runs in UTC), which keeps schedule assertions in tests
/// readable.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock at the given RFC 3339 instant.
    ///
    /// # Panics
    ///
    /// Panics on an unparseable instant; fixtures fail loudly.
    #[must_use]
    pub fn at(instant: &str) -> Self {
        Self {
            now: RwLock::new(instant.parse().expect("valid RFC 3339 instant")),
        }
    }

    /// Advances the clock.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    /// Jumps the clock to a new instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write() = instant;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }

    fn now_local(&self) -> NaiveDateTime {
        self.now.read().naive_utc()
    }
}

/// A ready-made identity.
#[must_use]
pub fn identity(credential: u64, holder: u64) -> Identity {
    Identity::new(CredentialId::new(credential), HolderId::new(holder))
}

/// A cached rule granting weekday office hours (09:00–17:00,
/// Monday through Friday).
#[must_use]
pub fn weekday_rule(holder: HolderId, control_point: ControlPointId) -> CachedRule {
    CachedRule {
        holder,
        control_point,
        allowed_days: [1u8, 2, 3, 4, 5].into_iter().collect(),
        start: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
        end: NaiveTime::from_hms_opt(17, 0, 0).expect("valid time"),
        last_synced_at: DateTime::<Utc>::MIN_UTC,
    }
}

/// A cached rule whose window crosses midnight (22:00–02:00, every
/// day).
#[must_use]
pub fn night_shift_rule(holder: HolderId, control_point: ControlPointId) -> CachedRule {
    CachedRule {
        holder,
        control_point,
        allowed_days: (0u8..=6).collect(),
        start: NaiveTime::from_hms_opt(22, 0, 0).expect("valid time"),
        end: NaiveTime::from_hms_opt(2, 0, 0).expect("valid time"),
        last_synced_at: DateTime::<Utc>::MIN_UTC,
    }
}

/// Opens a file-backed [`LocalStore`] in a fresh temporary directory.
///
/// The directory lives as long as the returned guard.
///
/// # Panics
///
/// Panics if the store cannot be created; fixtures fail loudly.
#[must_use]
pub fn temp_local_store() -> (LocalStore, TempDir) {
    let dir = tempfile::tempdir().expect("temporary directory");
    let store = LocalStore::open(dir.path()).expect("fresh local store");
    (store, dir)
}

/// Reopens a [`LocalStore`] at a path, for restart tests.
///
/// # Panics
///
/// Panics if the store cannot be opened.
#[must_use]
pub fn reopen_local_store(path: &Path) -> LocalStore {
    LocalStore::open(path).expect("reopen local store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_deterministically() {
        let clock = FixedClock::at("2025-03-10T10:00:00Z");
        let before = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - before, chrono::Duration::seconds(90));
    }

    #[test]
    fn weekday_rule_matches_monday_morning() {
        let clock = FixedClock::at("2025-03-10T10:00:00Z"); // Monday
        let rule = weekday_rule(HolderId::new(1), ControlPointId::new(1));
        assert!(rule.matches(clock.now_local()));
    }

    #[test]
    fn weekday_rule_rejects_saturday() {
        let clock = FixedClock::at("2025-03-15T10:00:00Z"); // Saturday
        let rule = weekday_rule(HolderId::new(1), ControlPointId::new(1));
        assert!(!rule.matches(clock.now_local()));
    }

    #[test]
    fn night_shift_rule_crosses_midnight() {
        let rule = night_shift_rule(HolderId::new(1), ControlPointId::new(1));
        let late = FixedClock::at("2025-03-10T23:30:00Z");
        let early = FixedClock::at("2025-03-11T01:00:00Z");
        let noon = FixedClock::at("2025-03-11T12:00:00Z");
        assert!(rule.matches(late.now_local()));
        assert!(rule.matches(early.now_local()));
        assert!(!rule.matches(noon.now_local()));
    }

    #[test]
    fn temp_store_roundtrip() {
        let (store, dir) = temp_local_store();
        assert!(store.events().is_empty());
        drop(store);
        let store = reopen_local_store(dir.path());
        assert!(store.rules().is_empty());
    }
}
