//! Tag-aware cache storage.
//!
//! `TagCache` is the seam to the host's key/value cache backend: entries are
//! written with a set of tags and later dropped in bulk by invalidating a tag.
//! The promo core only ever calls `get` and `set`; `invalidate_tags` is for the
//! host's content-change hooks.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::keys::{CacheKey, CacheTag};
use super::lock::rw_write;
use super::registry::TagRegistry;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend `{bin}` failed: {message}")]
    Backend { bin: &'static str, message: String },
}

impl CacheError {
    pub fn backend(bin: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            bin,
            message: message.into(),
        }
    }
}

/// How long an entry stays valid. Entries are never expired by time; they
/// live until a tag invalidates them or the bin evicts them for capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifetime {
    #[default]
    Permanent,
}

/// A stored value with the tags it was written with.
///
/// `data` is opaque to the store. An empty string is a legitimate value and
/// must not be confused with a miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: String,
    pub tags: BTreeSet<CacheTag>,
    pub lifetime: Lifetime,
}

#[async_trait]
pub trait TagCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(
        &self,
        key: CacheKey,
        data: String,
        lifetime: Lifetime,
        tags: BTreeSet<CacheTag>,
    ) -> Result<(), CacheError>;

    /// Drop every entry carrying any of `tags`; returns how many were removed.
    async fn invalidate_tags(&self, tags: &[CacheTag]) -> Result<usize, CacheError>;
}

/// In-process LRU cache bin with tag tracking.
pub struct MemoryTagCache {
    bin: &'static str,
    entries: RwLock<LruCache<CacheKey, CacheEntry>>,
    registry: TagRegistry,
}

impl MemoryTagCache {
    /// `bin` names the cache in logs and metric labels (`lookup`, `render`).
    pub fn new(bin: &'static str, capacity: std::num::NonZeroUsize) -> Self {
        Self {
            bin,
            entries: RwLock::new(LruCache::new(capacity)),
            registry: TagRegistry::new(),
        }
    }

    pub fn bin(&self) -> &'static str {
        self.bin
    }

    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        rw_write(&self.entries, SOURCE, "contains").contains(key)
    }

    pub fn clear(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        entries.clear();
        self.registry.clear();
    }

    fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) => {
                counter!("promo_embed_cache_hit_total", "bin" => self.bin).increment(1);
                Some(entry.clone())
            }
            None => {
                counter!("promo_embed_cache_miss_total", "bin" => self.bin).increment(1);
                None
            }
        }
    }

    // The registry is only touched while the entries lock is held, so an
    // entry is never stored without its tags being indexed.
    fn insert(&self, key: CacheKey, entry: CacheEntry) {
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        self.registry.register(key.clone(), entry.tags.clone());

        if let Some((evicted_key, _)) = entries.push(key.clone(), entry)
            && evicted_key != key
        {
            self.registry.unregister(&evicted_key);
            counter!("promo_embed_cache_evict_total", "bin" => self.bin).increment(1);
            debug!(bin = self.bin, key = %evicted_key, "Cache entry evicted for capacity");
        }
    }

    fn invalidate(&self, tags: &[CacheTag]) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_tags");
        let keys = self.registry.take_tagged(tags);
        let removed = keys
            .iter()
            .filter(|key| entries.pop(*key).is_some())
            .count();
        drop(entries);

        debug!(
            bin = self.bin,
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            removed,
            "Cache tags invalidated"
        );
        removed
    }
}

#[async_trait]
impl TagCache for MemoryTagCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.lookup(key))
    }

    async fn set(
        &self,
        key: CacheKey,
        data: String,
        lifetime: Lifetime,
        tags: BTreeSet<CacheTag>,
    ) -> Result<(), CacheError> {
        self.insert(
            key,
            CacheEntry {
                data,
                tags,
                lifetime,
            },
        );
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[CacheTag]) -> Result<usize, CacheError> {
        Ok(self.invalidate(tags))
    }
}

/// Cache bin that stores nothing; used when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTagCache;

#[async_trait]
impl TagCache for NullTagCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: CacheKey,
        _data: String,
        _lifetime: Lifetime,
        _tags: BTreeSet<CacheTag>,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn invalidate_tags(&self, _tags: &[CacheTag]) -> Result<usize, CacheError> {
        Ok(0)
    }
}
