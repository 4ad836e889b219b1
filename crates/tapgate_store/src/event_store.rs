//! Durable store of access events.

use crate::error::{StoreError, StoreResult};
use crate::record::RecordLog;
use crate::LogBackend;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tapgate_core::{AccessEvent, EventId, HolderId, NewEvent};

/// One durable mutation of the event table.
///
/// The log records operations rather than snapshots so that an append
/// (the hot path, one per transaction at the door) costs a single small
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum EventOp {
    /// A new event was recorded locally.
    Append(AccessEvent),
    /// The authority accepted a pushed event.
    MarkSynced {
        /// Local event id.
        id: EventId,
        /// Authority-assigned id.
        backend_id: u64,
    },
    /// The authority's history replaced all local rows for a holder.
    ReplaceFor {
        /// The holder whose rows were replaced.
        holder: HolderId,
        /// The authoritative rows, already re-identified locally.
        events: Vec<AccessEvent>,
    },
}

struct Inner {
    log: RecordLog,
    rows: Vec<AccessEvent>,
    next_id: u64,
}

impl Inner {
    fn apply(&mut self, op: &EventOp) {
        match op {
            EventOp::Append(event) => {
                self.next_id = self.next_id.max(event.id.as_u64() + 1);
                self.rows.push(event.clone());
            }
            EventOp::MarkSynced { id, backend_id } => {
                if let Some(row) = self.rows.iter_mut().find(|r| r.id == *id) {
                    row.backend_id = Some(*backend_id);
                    row.synced = true;
                }
            }
            EventOp::ReplaceFor { holder, events } => {
                self.rows.retain(|r| r.holder != *holder);
                for event in events {
                    self.next_id = self.next_id.max(event.id.as_u64() + 1);
                    self.rows.push(event.clone());
                }
            }
        }
    }

    fn persist(&mut self, op: &EventOp) -> StoreResult<()> {
        let mut buf = Vec::new();
        ciborium::into_writer(op, &mut buf).map_err(|e| StoreError::codec(e.to_string()))?;
        self.log.append(&buf)
    }
}

/// The durable queue of access events on one device.
///
/// Events are appended by the reader endpoint at decision time and
/// mutated only by the sync coordinator: [`EventStore::mark_synced`]
/// when the authority accepts a push, [`EventStore::replace_all_for`]
/// when the authority's history supersedes local rows.
///
/// # Concurrency
///
/// All mutation goes through one internal write lock; the reader
/// endpoint and the sync coordinator can share a single instance
/// without further coordination.
pub struct EventStore {
    inner: RwLock<Inner>,
}

impl EventStore {
    /// Opens an event store over the given backend, replaying its log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] for damage beyond a torn tail,
    /// or a codec error for undecodable rows.
    pub fn open(backend: Box<dyn LogBackend>) -> StoreResult<Self> {
        let (log, payloads) = RecordLog::open(backend)?;
        let mut inner = Inner {
            log,
            rows: Vec::new(),
            next_id: 1,
        };
        for payload in payloads {
            let op: EventOp = ciborium::from_reader(payload.as_slice())
                .map_err(|e| StoreError::codec(e.to_string()))?;
            inner.apply(&op);
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Opens an ephemeral in-memory store.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(Box::new(crate::MemoryBackend::new()))
    }

    /// Appends a new event, assigning its local id.
    pub fn append(&self, draft: NewEvent) -> StoreResult<EventId> {
        let mut inner = self.inner.write();
        let id = EventId::new(inner.next_id);
        let event = AccessEvent {
            id,
            backend_id: None,
            holder: draft.holder,
            control_point: draft.control_point,
            occurred_at: draft.occurred_at,
            granted: draft.granted,
            reason: draft.reason,
            synced: false,
        };
        let op = EventOp::Append(event);
        inner.persist(&op)?;
        inner.apply(&op);
        tracing::debug!(%id, "access event recorded");
        Ok(id)
    }

    /// Returns the unsynced events for a holder, oldest first.
    ///
    /// Events that carry a backend id are authoritative and are never
    /// returned here, whatever their `synced` flag says.
    #[must_use]
    pub fn unsynced_for(&self, holder: HolderId) -> Vec<AccessEvent> {
        let inner = self.inner.read();
        let mut events: Vec<AccessEvent> = inner
            .rows
            .iter()
            .filter(|r| r.holder == holder && !r.synced && !r.is_authoritative())
            .cloned()
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Marks an event as accepted by the authority.
    ///
    /// Idempotent: marking an event that already carries the same
    /// backend id is a no-op and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EventNotFound`] for an unknown id.
    pub fn mark_synced(&self, id: EventId, backend_id: u64) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let row = inner
            .rows
            .iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::EventNotFound { id })?;
        if row.synced && row.backend_id == Some(backend_id) {
            return Ok(());
        }
        let op = EventOp::MarkSynced { id, backend_id };
        inner.persist(&op)?;
        inner.apply(&op);
        Ok(())
    }

    /// Replaces every local row for a holder with the authoritative
    /// history.
    ///
    /// Local rows - synced and unsynced alike - are discarded in favor
    /// of the authority's list; this is what makes a push/pull race
    /// converge instead of duplicating. Incoming rows get fresh local
    /// ids and are installed as synced.
    ///
    /// Returns the number of rows installed.
    pub fn replace_all_for(
        &self,
        holder: HolderId,
        events: Vec<AccessEvent>,
    ) -> StoreResult<usize> {
        let mut inner = self.inner.write();
        let mut installed = Vec::with_capacity(events.len());
        let mut next_id = inner.next_id;
        for mut event in events {
            event.id = EventId::new(next_id);
            next_id += 1;
            event.holder = holder;
            event.synced = true;
            installed.push(event);
        }
        let count = installed.len();
        let op = EventOp::ReplaceFor {
            holder,
            events: installed,
        };
        inner.persist(&op)?;
        inner.apply(&op);
        tracing::debug!(%holder, count, "event history replaced from authority");
        Ok(count)
    }

    /// Returns all events for a holder, oldest first.
    #[must_use]
    pub fn all_for(&self, holder: HolderId) -> Vec<AccessEvent> {
        let inner = self.inner.read();
        let mut events: Vec<AccessEvent> = inner
            .rows
            .iter()
            .filter(|r| r.holder == holder)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Returns every stored event, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<AccessEvent> {
        let inner = self.inner.read();
        let mut events = inner.rows.clone();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Total number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Returns true if the store holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events still waiting for the authority.
    #[must_use]
    pub fn unsynced_len(&self) -> usize {
        self.inner
            .read()
            .rows
            .iter()
            .filter(|r| !r.synced && !r.is_authoritative())
            .count()
    }

    /// Rewrites the log as plain appends of the current rows.
    ///
    /// The operation log otherwise grows with every sync cycle.
    pub fn compact(&self) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let mut payloads = Vec::with_capacity(inner.rows.len());
        for row in &inner.rows {
            let mut buf = Vec::new();
            ciborium::into_writer(&EventOp::Append(row.clone()), &mut buf)
                .map_err(|e| StoreError::codec(e.to_string()))?;
            payloads.push(buf);
        }
        inner.log.reset(&payloads)
    }

    /// Returns true if a torn log tail was dropped during open.
    #[must_use]
    pub fn recovered_truncation(&self) -> bool {
        self.inner.read().log.recovered_truncation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use chrono::Utc;
    use tapgate_core::ControlPointId;

    fn draft(holder: u64) -> NewEvent {
        NewEvent {
            holder: HolderId::new(holder),
            control_point: ControlPointId::new(1),
            occurred_at: Utc::now(),
            granted: true,
            reason: "within permitted schedule".into(),
        }
    }

    fn authority_event(backend_id: u64) -> AccessEvent {
        AccessEvent {
            id: EventId::new(0),
            backend_id: Some(backend_id),
            holder: HolderId::new(1),
            control_point: ControlPointId::new(1),
            occurred_at: Utc::now(),
            granted: true,
            reason: "within permitted schedule".into(),
            synced: true,
        }
    }

    #[test]
    fn append_assigns_monotonic_ids() {
        let store = EventStore::in_memory().unwrap();
        let a = store.append(draft(1)).unwrap();
        let b = store.append(draft(1)).unwrap();
        assert_eq!(a, EventId::new(1));
        assert_eq!(b, EventId::new(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unsynced_tracking() {
        let store = EventStore::in_memory().unwrap();
        let id = store.append(draft(1)).unwrap();
        store.append(draft(2)).unwrap();

        assert_eq!(store.unsynced_for(HolderId::new(1)).len(), 1);

        store.mark_synced(id, 501).unwrap();
        assert!(store.unsynced_for(HolderId::new(1)).is_empty());
        assert_eq!(store.unsynced_len(), 1); // holder 2 still queued

        let row = &store.all_for(HolderId::new(1))[0];
        assert_eq!(row.backend_id, Some(501));
        assert!(row.synced);
    }

    #[test]
    fn mark_synced_is_idempotent() {
        let store = EventStore::in_memory().unwrap();
        let id = store.append(draft(1)).unwrap();
        store.mark_synced(id, 7).unwrap();
        store.mark_synced(id, 7).unwrap();
        assert_eq!(store.all_for(HolderId::new(1))[0].backend_id, Some(7));
    }

    #[test]
    fn mark_synced_unknown_id_fails() {
        let store = EventStore::in_memory().unwrap();
        assert!(matches!(
            store.mark_synced(EventId::new(99), 1),
            Err(StoreError::EventNotFound { .. })
        ));
    }

    #[test]
    fn replace_all_for_discards_local_rows() {
        let store = EventStore::in_memory().unwrap();
        store.append(draft(1)).unwrap();
        store.append(draft(1)).unwrap();
        store.append(draft(2)).unwrap();

        let installed = store
            .replace_all_for(HolderId::new(1), vec![authority_event(900)])
            .unwrap();
        assert_eq!(installed, 1);

        let rows = store.all_for(HolderId::new(1));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].backend_id, Some(900));
        assert!(rows[0].synced);
        // Holder 2 untouched.
        assert_eq!(store.all_for(HolderId::new(2)).len(), 1);
    }

    #[test]
    fn replayed_store_matches_live_state() {
        let backend = MemoryBackend::new();
        let raw;
        {
            let store = EventStore::open(Box::new(backend)).unwrap();
            let id = store.append(draft(1)).unwrap();
            store.append(draft(1)).unwrap();
            store.mark_synced(id, 42).unwrap();
            raw = snapshot(&store);
        }

        let store = EventStore::open(Box::new(MemoryBackend::with_data(raw))).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.unsynced_len(), 1);
        assert_eq!(store.all_for(HolderId::new(1))[0].backend_id, Some(42));
        // Ids keep advancing after replay.
        let next = store.append(draft(1)).unwrap();
        assert_eq!(next, EventId::new(3));
    }

    fn snapshot(store: &EventStore) -> Vec<u8> {
        store.inner.read().log.raw_for_tests()
    }

    #[test]
    fn compact_preserves_rows() {
        let store = EventStore::in_memory().unwrap();
        let id = store.append(draft(1)).unwrap();
        store.mark_synced(id, 5).unwrap();
        store.compact().unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.all_for(HolderId::new(1))[0].backend_id, Some(5));
    }
}
