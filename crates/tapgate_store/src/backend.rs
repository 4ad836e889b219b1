//! Log backend trait definition.

use crate::error::StoreResult;

/// A low-level append-only byte log.
///
/// Backends are **opaque byte stores**: they do not understand record
/// framing, rules, or events. The store owns all format interpretation.
///
/// # Invariants
///
/// - `append` returns the offset where the data landed
/// - `read_at` returns exactly the bytes previously written there
/// - after `sync` returns, appended data survives process termination
/// - backends must be `Send + Sync`; interior locking is the
///   implementation's concern
///
/// # Implementors
///
/// - [`crate::MemoryBackend`] for tests and ephemeral stores
/// - [`crate::FileBackend`] for devices
pub trait LogBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::ReadPastEnd`] if the range extends
    /// beyond the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>>;

    /// Appends data to the end of the log and returns its offset.
    fn append(&mut self, data: &[u8]) -> StoreResult<u64>;

    /// Pushes buffered writes to the OS.
    fn flush(&mut self) -> StoreResult<()>;

    /// Makes all appended data durable (data and metadata).
    fn sync(&mut self) -> StoreResult<()>;

    /// Returns the current size of the log in bytes.
    fn len(&self) -> StoreResult<u64>;

    /// Returns true if the log is empty.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncates the log to `new_len` bytes.
    ///
    /// Used to drop a torn tail after replay and to reset a log for a
    /// full rewrite.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::TruncateBeyondEnd`] if `new_len`
    /// exceeds the current size.
    fn truncate(&mut self, new_len: u64) -> StoreResult<()>;
}
