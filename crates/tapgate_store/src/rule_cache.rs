//! Durable cache of offline policy rules.

use crate::error::{StoreError, StoreResult};
use crate::record::RecordLog;
use crate::LogBackend;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tapgate_core::{CachedRule, ControlPointId, HolderId};

type RuleKey = (HolderId, ControlPointId);

struct Inner {
    log: RecordLog,
    index: HashMap<RuleKey, Vec<CachedRule>>,
}

/// The offline projection of the authority's policy rules.
///
/// The cache is versioned by replacement: every successful sync
/// replaces the whole content, and stale entries are dropped wholesale
/// rather than diffed. There is deliberately no partial update
/// operation.
///
/// # Atomicity
///
/// [`RuleCache::replace_all`] builds the new index aside and swaps it
/// under the write lock, rewriting the log in the same critical
/// section; a concurrent [`RuleCache::lookup`] sees either the old or
/// the new rule set, never a mixture.
pub struct RuleCache {
    inner: RwLock<Inner>,
}

impl RuleCache {
    /// Opens a rule cache over the given backend, replaying its log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] for damage beyond a torn tail,
    /// or a codec error for undecodable rows.
    pub fn open(backend: Box<dyn LogBackend>) -> StoreResult<Self> {
        let (log, payloads) = RecordLog::open(backend)?;
        let mut index: HashMap<RuleKey, Vec<CachedRule>> = HashMap::new();
        for payload in payloads {
            let rule: CachedRule = ciborium::from_reader(payload.as_slice())
                .map_err(|e| StoreError::codec(e.to_string()))?;
            index
                .entry((rule.holder, rule.control_point))
                .or_default()
                .push(rule);
        }
        Ok(Self {
            inner: RwLock::new(Inner { log, index }),
        })
    }

    /// Opens an ephemeral in-memory cache.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(Box::new(crate::MemoryBackend::new()))
    }

    /// Replaces the entire cache content.
    ///
    /// # Errors
    ///
    /// Rejects the whole batch if any rule fails validation; a sync
    /// must not install a half-valid rule set.
    pub fn replace_all(&self, rules: Vec<CachedRule>) -> StoreResult<()> {
        let mut payloads = Vec::with_capacity(rules.len());
        let mut index: HashMap<RuleKey, Vec<CachedRule>> = HashMap::new();
        for rule in rules {
            rule.validate()?;
            let mut buf = Vec::new();
            ciborium::into_writer(&rule, &mut buf)
                .map_err(|e| StoreError::codec(e.to_string()))?;
            payloads.push(buf);
            index
                .entry((rule.holder, rule.control_point))
                .or_default()
                .push(rule);
        }

        let mut inner = self.inner.write();
        inner.log.reset(&payloads)?;
        inner.index = index;
        tracing::debug!(rules = payloads.len(), "rule cache replaced");
        Ok(())
    }

    /// Returns the cached rules for a `(holder, control point)` pair.
    #[must_use]
    pub fn lookup(&self, holder: HolderId, control_point: ControlPointId) -> Vec<CachedRule> {
        self.inner
            .read()
            .index
            .get(&(holder, control_point))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of cached rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().index.values().map(Vec::len).sum()
    }

    /// Returns true if the cache holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent sync stamp across all cached rules.
    #[must_use]
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .index
            .values()
            .flatten()
            .map(|r| r.last_synced_at)
            .max()
    }

    /// Returns every cached rule (for inspection tooling).
    #[must_use]
    pub fn all(&self) -> Vec<CachedRule> {
        self.inner.read().index.values().flatten().cloned().collect()
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
    use chrono::NaiveTime;

    fn rule(holder: u64, point: u64, days: &[u8]) -> CachedRule {
        CachedRule {
            holder: HolderId::new(holder),
            control_point: ControlPointId::new(point),
            allowed_days: days.iter().copied().collect(),
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            last_synced_at: Utc::now(),
        }
    }

    #[test]
    fn replace_then_lookup() {
        let cache = RuleCache::in_memory().unwrap();
        cache
            .replace_all(vec![rule(1, 1, &[1, 2, 3]), rule(1, 2, &[0, 6]), rule(2, 1, &[4])])
            .unwrap();

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.lookup(HolderId::new(1), ControlPointId::new(1)).len(), 1);
        assert_eq!(cache.lookup(HolderId::new(1), ControlPointId::new(2)).len(), 1);
        assert!(cache.lookup(HolderId::new(3), ControlPointId::new(1)).is_empty());
    }

    #[test]
    fn replace_is_destructive() {
        let cache = RuleCache::in_memory().unwrap();
        cache.replace_all(vec![rule(1, 1, &[1])]).unwrap();
        cache.replace_all(vec![rule(2, 2, &[2])]).unwrap();

        assert!(cache.lookup(HolderId::new(1), ControlPointId::new(1)).is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalid_rule_rejects_whole_batch() {
        let cache = RuleCache::in_memory().unwrap();
        cache.replace_all(vec![rule(1, 1, &[1])]).unwrap();

        let result = cache.replace_all(vec![rule(2, 2, &[2]), rule(3, 3, &[9])]);
        assert!(matches!(result, Err(StoreError::InvalidRule(_))));
        // Old content still in place.
        assert_eq!(cache.lookup(HolderId::new(1), ControlPointId::new(1)).len(), 1);
    }

    #[test]
    fn replayed_cache_matches_live_state() {
        let raw;
        {
            let cache = RuleCache::open(Box::new(MemoryBackend::new())).unwrap();
            cache
                .replace_all(vec![rule(1, 1, &[1, 2]), rule(1, 1, &[3])])
                .unwrap();
            raw = cache.inner.read().log.raw_for_tests();
        }

        let cache = RuleCache::open(Box::new(MemoryBackend::with_data(raw))).unwrap();
        assert_eq!(cache.lookup(HolderId::new(1), ControlPointId::new(1)).len(), 2);
    }

    #[test]
    fn last_synced_at_tracks_maximum() {
        let cache = RuleCache::in_memory().unwrap();
        assert!(cache.last_synced_at().is_none());

        let mut early = rule(1, 1, &[1]);
        early.last_synced_at = "2025-01-01T00:00:00Z".parse().unwrap();
        let mut late = rule(1, 2, &[1]);
        late.last_synced_at = "2025-06-01T00:00:00Z".parse().unwrap();

        cache.replace_all(vec![early, late.clone()]).unwrap();
        assert_eq!(cache.last_synced_at(), Some(late.last_synced_at));
    }
}
