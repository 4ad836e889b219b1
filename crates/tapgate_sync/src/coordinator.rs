//! Sync coordinator state machine.

use crate::authority::AuthorityClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tapgate_core::HolderId;
use tapgate_store::{EventStore, RuleCache};

/// The current state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not syncing.
    Idle,
    /// Pulling the rule projection.
    PullingRules,
    /// Pulling and reconciling the event history.
    PullingEvents,
    /// Pushing unsynced local events.
    Pushing,
    /// Last cycle completed.
    Synced,
    /// Last cycle failed.
    Error,
    /// Waiting before a retry attempt.
    RetryWait,
}

impl SyncState {
    /// Returns true while a cycle is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::PullingRules | SyncState::PullingEvents | SyncState::Pushing
        )
    }

    /// Returns true if a new cycle may start.
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            SyncState::Idle | SyncState::Synced | SyncState::Error | SyncState::RetryWait
        )
    }
}

/// Counters across the life of a coordinator.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed cycles.
    pub cycles_completed: u64,
    /// Rules installed by pulls.
    pub rules_pulled: u64,
    /// Event rows installed from authoritative history.
    pub events_reconciled: u64,
    /// Events accepted by the authority.
    pub events_pushed: u64,
    /// Individual push failures (left queued).
    pub push_failures: u64,
    /// Whole-cycle retries.
    pub retries: u64,
    /// When the last successful cycle finished.
    pub last_sync_time: Option<Instant>,
    /// Message of the last error.
    pub last_error: Option<String>,
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Rules installed into the cache.
    pub rules_replaced: usize,
    /// Event rows installed from authoritative history.
    pub events_reconciled: usize,
    /// Events accepted by the authority this cycle.
    pub pushed: usize,
    /// Events whose push failed and stayed queued.
    pub push_failures: usize,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
    /// True if the cycle completed with nothing left queued.
    pub success: bool,
}

/// Drives reconciliation between the local store and the authority.
///
/// Triggered on reconnect or manually; runs the pull-then-push cycle
/// described at the crate root. The coordinator shares the store with
/// the reader endpoint; the store's own locking serializes their
/// writes.
pub struct SyncCoordinator<A: AuthorityClient> {
    config: SyncConfig,
    authority: Arc<A>,
    rules: Arc<RuleCache>,
    events: Arc<EventStore>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<A: AuthorityClient> SyncCoordinator<A> {
    /// Creates a coordinator over shared stores.
    pub fn new(
        config: SyncConfig,
        authority: Arc<A>,
        rules: Arc<RuleCache>,
        events: Arc<EventStore>,
    ) -> Self {
        Self {
            config,
            authority,
            rules,
            events,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Requests cancellation of the running cycle.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn handle_error(&self, error: &SyncError) {
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }

    /// Runs one sync cycle for a holder.
    ///
    /// Order matters and is fixed: rules, then history, then pushes.
    /// Pulling history before pushing means an event that reached the
    /// authority through an earlier, interrupted cycle is recognized
    /// (its local unsynced twin is replaced by the authoritative row)
    /// instead of being pushed again.
    ///
    /// # Errors
    ///
    /// Pull failures abort the cycle. Individual push failures do
    /// *not*: the event stays queued and the cycle reports them in
    /// [`SyncReport::push_failures`].
    pub fn sync(&self, holder: HolderId) -> SyncResult<SyncReport> {
        let start = Instant::now();
        self.cancelled.store(false, Ordering::SeqCst);

        if !self.state().can_start() {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", self.state()),
                to: "sync".into(),
            });
        }

        // Step 1: authoritative rules replace the cache wholesale.
        self.set_state(SyncState::PullingRules);
        let pulled_rules = match self.authority.pull_rules(holder) {
            Ok(rules) => rules,
            Err(e) => {
                self.handle_error(&e);
                return Err(e);
            }
        };
        let rules_replaced = pulled_rules.len();
        if let Err(e) = self.rules.replace_all(pulled_rules).map_err(SyncError::from) {
            self.handle_error(&e);
            return Err(e);
        }

        self.check_cancelled()?;

        // Step 2: authoritative history replaces local rows.
        self.set_state(SyncState::PullingEvents);
        let history = match self.authority.pull_events(holder) {
            Ok(events) => events,
            Err(e) => {
                self.handle_error(&e);
                return Err(e);
            }
        };
        let events_reconciled = match self
            .events
            .replace_all_for(holder, history)
            .map_err(SyncError::from)
        {
            Ok(count) => count,
            Err(e) => {
                self.handle_error(&e);
                return Err(e);
            }
        };

        self.check_cancelled()?;

        // Step 3: push whatever is still unsynced, one event at a time.
        self.set_state(SyncState::Pushing);
        let mut pushed = 0usize;
        let mut push_failures = 0usize;
        for event in self.events.unsynced_for(holder) {
            self.check_cancelled()?;
            match self.authority.push_event(&event) {
                Ok(backend_id) => {
                    if let Err(e) = self
                        .events
                        .mark_synced(event.id, backend_id)
                        .map_err(SyncError::from)
                    {
                        self.handle_error(&e);
                        return Err(e);
                    }
                    pushed += 1;
                }
                Err(e) => {
                    // Tolerated: the event stays queued for the next
                    // cycle.
                    tracing::warn!(id = %event.id, error = %e, "event push failed");
                    push_failures += 1;
                }
            }
        }

        let report = SyncReport {
            rules_replaced,
            events_reconciled,
            pushed,
            push_failures,
            duration: start.elapsed(),
            success: push_failures == 0,
        };

        self.set_state(SyncState::Synced);
        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.rules_pulled += rules_replaced as u64;
            stats.events_reconciled += events_reconciled as u64;
            stats.events_pushed += pushed as u64;
            stats.push_failures += push_failures as u64;
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
        }
        tracing::debug!(
            rules = report.rules_replaced,
            reconciled = report.events_reconciled,
            pushed = report.pushed,
            failures = report.push_failures,
            "sync cycle finished"
        );

        Ok(report)
    }

    /// Runs a cycle with bounded retries on transient errors.
    pub fn sync_with_retry(&self, holder: HolderId) -> SyncResult<SyncReport> {
        let retry = self.config.retry.clone();
        let mut last_error = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                self.set_state(SyncState::RetryWait);
                std::thread::sleep(retry.delay_for_attempt(attempt));
                self.stats.write().retries += 1;
            }

            match self.sync(holder) {
                Ok(report) => return Ok(report),
                Err(e) => {
                    if e.is_retryable() && attempt + 1 < retry.max_attempts {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SyncError::Protocol("no sync attempts made".into())))
    }

    /// The configured device id, for diagnostics.
    #[must_use]
    pub fn device_id(&self) -> uuid::Uuid {
        self.config.device_id
    }
}
