//! Authority client abstraction.

use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tapgate_core::{AccessDecision, AccessEvent, CachedRule, ControlPointId, HolderId};

/// The narrow interface through which the core consumes the central
/// authority.
///
/// The authority owns the canonical rule set, the canonical event
/// history, and - crucially - event deduplication: pushing the same
/// event twice must yield one authoritative row, and this trait's
/// implementors are trusted to guarantee it.
pub trait AuthorityClient: Send + Sync {
    /// Asks the authority for an online decision.
    fn validate(
        &self,
        holder: HolderId,
        control_point: ControlPointId,
        at: DateTime<Utc>,
    ) -> SyncResult<AccessDecision>;

    /// Pulls the offline rule projection for a holder.
    fn pull_rules(&self, holder: HolderId) -> SyncResult<Vec<CachedRule>>;

    /// Pulls the authoritative event history for a holder.
    fn pull_events(&self, holder: HolderId) -> SyncResult<Vec<AccessEvent>>;

    /// Pushes one locally recorded event; returns the backend id.
    fn push_event(&self, event: &AccessEvent) -> SyncResult<u64>;

    /// Returns true if the authority looks reachable right now.
    ///
    /// A cheap liveness hint, not a guarantee; callers must still
    /// handle failures from the other methods.
    fn is_reachable(&self) -> bool;
}

/// An in-memory authority for tests.
///
/// Responses are settable per method; pushes are recorded and assigned
/// sequential backend ids unless a failure is queued.
#[derive(Default)]
pub struct MockAuthority {
    reachable: AtomicBool,
    validate_response: Mutex<Option<AccessDecision>>,
    rules: Mutex<Vec<CachedRule>>,
    events: Mutex<Vec<AccessEvent>>,
    pushed: Mutex<Vec<AccessEvent>>,
    push_failures: Mutex<VecDeque<SyncError>>,
    rule_pull_failures: Mutex<VecDeque<SyncError>>,
    next_backend_id: AtomicU64,
}

impl MockAuthority {
    /// Creates a reachable mock with no canned data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            validate_response: Mutex::new(None),
            rules: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            pushed: Mutex::new(Vec::new()),
            push_failures: Mutex::new(VecDeque::new()),
            rule_pull_failures: Mutex::new(VecDeque::new()),
            next_backend_id: AtomicU64::new(1000),
        }
    }

    /// Sets the reachability hint.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Sets the online decision returned by `validate`.
    pub fn set_validate_response(&self, decision: AccessDecision) {
        *self.validate_response.lock() = Some(decision);
    }

    /// Sets the rules returned by `pull_rules`.
    pub fn set_rules(&self, rules: Vec<CachedRule>) {
        *self.rules.lock() = rules;
    }

    /// Sets the history returned by `pull_events`.
    pub fn set_events(&self, events: Vec<AccessEvent>) {
        *self.events.lock() = events;
    }

    /// Queues an error for the next push call.
    pub fn fail_next_push(&self, error: SyncError) {
        self.push_failures.lock().push_back(error);
    }

    /// Queues an error for the next rule pull.
    pub fn fail_next_rules_pull(&self, error: SyncError) {
        self.rule_pull_failures.lock().push_back(error);
    }

    /// Returns all events pushed so far.
    #[must_use]
    pub fn pushed(&self) -> Vec<AccessEvent> {
        self.pushed.lock().clone()
    }
}

impl AuthorityClient for MockAuthority {
    fn validate(
        &self,
        _holder: HolderId,
        _control_point: ControlPointId,
        _at: DateTime<Utc>,
    ) -> SyncResult<AccessDecision> {
        if !self.is_reachable() {
            return Err(SyncError::NotReachable);
        }
        self.validate_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock validate response set".into()))
    }

    fn pull_rules(&self, _holder: HolderId) -> SyncResult<Vec<CachedRule>> {
        if !self.is_reachable() {
            return Err(SyncError::NotReachable);
        }
        if let Some(error) = self.rule_pull_failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.rules.lock().clone())
    }

    fn pull_events(&self, _holder: HolderId) -> SyncResult<Vec<AccessEvent>> {
        if !self.is_reachable() {
            return Err(SyncError::NotReachable);
        }
        Ok(self.events.lock().clone())
    }

    fn push_event(&self, event: &AccessEvent) -> SyncResult<u64> {
        if !self.is_reachable() {
            return Err(SyncError::NotReachable);
        }
        if let Some(error) = self.push_failures.lock().pop_front() {
            return Err(error);
        }
        self.pushed.lock().push(event.clone());
        Ok(self.next_backend_id.fetch_add(1, Ordering::SeqCst))
    }

    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tapgate_core::EventId;

    fn event() -> AccessEvent {
        AccessEvent {
            id: EventId::new(1),
            backend_id: None,
            holder: HolderId::new(1),
            control_point: ControlPointId::new(1),
            occurred_at: Utc::now(),
            granted: true,
            reason: "ok".into(),
            synced: false,
        }
    }

    #[test]
    fn unreachable_mock_fails_everything() {
        let authority = MockAuthority::new();
        authority.set_reachable(false);

        assert!(!authority.is_reachable());
        assert!(matches!(
            authority.pull_rules(HolderId::new(1)),
            Err(SyncError::NotReachable)
        ));
        assert!(matches!(
            authority.push_event(&event()),
            Err(SyncError::NotReachable)
        ));
    }

    #[test]
    fn pushes_get_sequential_backend_ids() {
        let authority = MockAuthority::new();
        let a = authority.push_event(&event()).unwrap();
        let b = authority.push_event(&event()).unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(authority.pushed().len(), 2);
    }

    #[test]
    fn queued_push_failure_fires_once() {
        let authority = MockAuthority::new();
        authority.fail_next_push(SyncError::Authority("duplicate suspected".into()));

        assert!(authority.push_event(&event()).is_err());
        assert!(authority.push_event(&event()).is_ok());
    }
}
