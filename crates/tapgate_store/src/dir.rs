//! Store directory layout and process-level locking.
//!
//! ```text
//! <store>/
//! ├─ LOCK        # advisory lock, single writer per device
//! ├─ events.log  # event store log
//! └─ rules.log   # rule cache log
//! ```

use crate::error::{StoreError, StoreResult};
use crate::event_store::EventStore;
use crate::file::FileBackend;
use crate::rule_cache::RuleCache;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOCK_FILE: &str = "LOCK";
const EVENTS_LOG: &str = "events.log";
const RULES_LOG: &str = "rules.log";

/// An exclusively held store directory.
///
/// Each device owns its local store; the advisory lock makes a second
/// process opening the same directory fail fast instead of corrupting
/// the logs. The lock is held for the lifetime of this value.
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (creating if needed) a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the
    /// lock, or an I/O error.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path)?;

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the event store log.
    #[must_use]
    pub fn events_log_path(&self) -> PathBuf {
        self.path.join(EVENTS_LOG)
    }

    /// Path of the rule cache log.
    #[must_use]
    pub fn rules_log_path(&self) -> PathBuf {
        self.path.join(RULES_LOG)
    }
}

/// The pair of durable tables a device runs on.
///
/// Holds the directory lock and both stores; the reader endpoint and
/// the sync coordinator receive clones of the inner [`Arc`]s and share
/// the same state.
pub struct LocalStore {
    dir: StoreDir,
    events: Arc<EventStore>,
    rules: Arc<RuleCache>,
}

impl LocalStore {
    /// Opens both stores inside a locked directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let dir = StoreDir::open(path)?;
        let events = EventStore::open(Box::new(FileBackend::open(&dir.events_log_path())?))?;
        let rules = RuleCache::open(Box::new(FileBackend::open(&dir.rules_log_path())?))?;
        Ok(Self {
            dir,
            events: Arc::new(events),
            rules: Arc::new(rules),
        })
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &StoreDir {
        &self.dir
    }

    /// The shared event store.
    #[must_use]
    pub fn events(&self) -> Arc<EventStore> {
        Arc::clone(&self.events)
    }

    /// The shared rule cache.
    #[must_use]
    pub fn rules(&self) -> Arc<RuleCache> {
        Arc::clone(&self.rules)
    }
}
