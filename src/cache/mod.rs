//! Deduplicating resource tables
//!
//! One [`ResourceCache`] exists per resource kind. A lookup that misses
//! inserts an empty placeholder under the table lock, so concurrent loads of
//! the same key share one entry and only the caller that created the
//! placeholder populates it. Population happens outside the lock.

pub mod metrics;

use crate::error::{AssetError, Result};
use metrics::AssetMetricsHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use xxhash_rust::xxh3::xxh3_64;

/// Normalized identifier of a resource within one cache
///
/// Backslashes become `/` and leading `./` segments are dropped. The xxh3
/// hash is computed once and reused for every table lookup.
#[derive(Clone)]
pub struct ResourceKey {
    name: Arc<str>,
    hash: u64,
}

impl ResourceKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        let mut normalized = name.as_ref().replace('\\', "/");
        while let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        }
        let hash = xxh3_64(normalized.as_bytes());
        Self {
            name: Arc::from(normalized),
            hash,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceKey").field(&self.name).finish()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Lifecycle of a cache entry; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntryState {
    /// Inserted, nothing loaded yet
    Placeholder = 0,
    /// CPU-side contents written
    Populated = 1,
    /// GPU-side step finished; safe to use
    Ready = 2,
}

impl EntryState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EntryState::Placeholder,
            1 => EntryState::Populated,
            _ => EntryState::Ready,
        }
    }
}

/// One cached resource
///
/// Contents are written once by whoever performs the load and are
/// read-only afterwards. Callers must poll [`is_ready`](Self::is_ready)
/// before using a handle returned by a load.
pub struct ResourceEntry<T> {
    key: ResourceKey,
    value: OnceLock<T>,
    state: AtomicU8,
    failed: AtomicBool,
}

/// Shared handle to a cache entry
pub type Handle<T> = Arc<ResourceEntry<T>>;

impl<T> ResourceEntry<T> {
    pub(crate) fn placeholder(key: ResourceKey) -> Self {
        Self {
            key,
            value: OnceLock::new(),
            state: AtomicU8::new(EntryState::Placeholder as u8),
            failed: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn state(&self) -> EntryState {
        EntryState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EntryState::Ready
    }

    pub fn is_populated(&self) -> bool {
        self.state() >= EntryState::Populated
    }

    /// Loaded contents, once populated
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Write the contents; returns false if they were already written
    pub fn populate(&self, value: T) -> bool {
        if self.value.set(value).is_err() {
            log::debug!("[ResourceCache] {} is already populated", self.key);
            return false;
        }
        self.advance(EntryState::Populated);
        true
    }

    /// Mark the entry usable; returns false if it already was
    ///
    /// An entry without contents cannot become ready.
    pub fn mark_ready(&self) -> bool {
        if self.value.get().is_none() {
            log::warn!("[ResourceCache] {} marked ready before being populated", self.key);
            return false;
        }
        self.advance(EntryState::Ready)
    }

    /// Record that the load or upload gave up; the entry will never be ready
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn advance(&self, to: EntryState) -> bool {
        self.state.fetch_max(to as u8, Ordering::AcqRel) < to as u8
    }
}

impl<T> fmt::Debug for ResourceEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEntry")
            .field("key", &self.key)
            .field("state", &self.state())
            .field("failed", &self.is_failed())
            .finish()
    }
}

/// Key to shared-handle table for one resource kind
pub struct ResourceCache<T> {
    kind: &'static str,
    table: Mutex<HashMap<ResourceKey, Handle<T>>>,
    metrics: AssetMetricsHandle,
}

impl<T> ResourceCache<T> {
    /// Create an empty cache; `kind` names it in logs and errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            table: Mutex::new(HashMap::new()),
            metrics: AssetMetricsHandle::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn metrics(&self) -> &AssetMetricsHandle {
        &self.metrics
    }

    /// Return the entry for `key`, inserting a placeholder on a miss
    ///
    /// The boolean is true only for the caller that inserted the
    /// placeholder; that caller is responsible for populating it.
    pub fn get_or_insert(&self, key: ResourceKey) -> (Handle<T>, bool) {
        let mut table = self.table.lock();
        if let Some(entry) = table.get(&key) {
            self.metrics.record_cache_hit();
            return (Arc::clone(entry), false);
        }

        self.metrics.record_cache_miss();
        let entry = Arc::new(ResourceEntry::placeholder(key.clone()));
        table.insert(key, Arc::clone(&entry));
        (entry, true)
    }

    /// Look up an existing entry without ever creating one
    pub fn get_by_name(&self, key: &ResourceKey) -> Result<Handle<T>> {
        match self.table.lock().get(key) {
            Some(entry) => Ok(Arc::clone(entry)),
            None => {
                log::error!("[ResourceCache] Can not find {} named {}", self.kind, key);
                Err(AssetError::NotFound {
                    kind: self.kind,
                    key: key.to_string(),
                })
            }
        }
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.table.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<ResourceKey> {
        self.table.lock().keys().cloned().collect()
    }

    /// Remove every entry nobody outside the cache references
    ///
    /// The removed handles are returned so the caller can release their GPU
    /// side; once they drop, the resources are gone.
    pub fn sweep(&self) -> Vec<Handle<T>> {
        let mut removed = Vec::new();
        self.table.lock().retain(|_, entry| {
            if Arc::strong_count(entry) == 1 {
                removed.push(Arc::clone(entry));
                false
            } else {
                true
            }
        });

        if !removed.is_empty() {
            self.metrics.record_evictions(removed.len());
            log::debug!("[ResourceCache] Evicted {} {} entries", removed.len(), self.kind);
        }
        removed
    }

    /// Drop every entry regardless of outside references
    pub fn clear(&self) {
        self.table.lock().clear();
    }
}

impl<T> fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(ResourceKey::new("./models\\cube.obj"), ResourceKey::new("models/cube.obj"));
        assert_eq!(ResourceKey::new("a/b").as_str(), "a/b");
        assert_ne!(ResourceKey::new("a/b"), ResourceKey::new("a/c"));
    }

    #[test]
    fn test_get_or_insert_dedupes() {
        let cache: ResourceCache<u32> = ResourceCache::new("number");
        let (first, created) = cache.get_or_insert("one".into());
        assert!(created);
        let (second, created) = cache.get_or_insert("one".into());
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.metrics().cache_misses(), 1);
        assert_eq!(cache.metrics().cache_hits(), 1);
    }

    #[test]
    fn test_entry_state_never_regresses() {
        let entry = ResourceEntry::placeholder(ResourceKey::new("k"));
        assert_eq!(entry.state(), EntryState::Placeholder);
        assert!(!entry.mark_ready());
        assert_eq!(entry.state(), EntryState::Placeholder);

        assert!(entry.populate(7u32));
        assert_eq!(entry.state(), EntryState::Populated);
        assert!(entry.mark_ready());
        assert!(entry.is_ready());

        // a late second writer neither changes contents nor state
        assert!(!entry.populate(9));
        assert_eq!(entry.get(), Some(&7));
        assert!(entry.is_ready());
    }

    #[test]
    fn test_failed_flag_keeps_state() {
        let entry = ResourceEntry::placeholder(ResourceKey::new("k"));
        assert!(entry.populate(1u32));
        assert!(!entry.is_failed());

        entry.mark_failed();
        assert!(entry.is_failed());
        assert_eq!(entry.state(), EntryState::Populated);
    }

    #[test]
    fn test_get_by_name_never_creates() {
        let cache: ResourceCache<u32> = ResourceCache::new("number");
        let result = cache.get_by_name(&ResourceKey::new("missing"));
        assert!(matches!(result, Err(AssetError::NotFound { kind: "number", .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_keeps_referenced_entries() {
        let cache: ResourceCache<u32> = ResourceCache::new("number");
        let (held, _) = cache.get_or_insert("held".into());
        let (_, _) = cache.get_or_insert("dropped".into());

        let removed = cache.sweep();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].key().as_str(), "dropped");
        assert!(cache.contains(held.key()));
        assert_eq!(cache.len(), 1);

        drop(held);
        assert_eq!(cache.sweep().len(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.metrics().evictions(), 2);
    }
}
