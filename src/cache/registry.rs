//! Bidirectional tag registry.
//!
//! Tracks which cache keys carry which tags so a tag invalidation can find
//! every affected entry, and so evicted entries can be forgotten.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, CacheTag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<CacheKey>>>,
    key_to_tags: RwLock<HashMap<CacheKey, BTreeSet<CacheTag>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Record the tags of a cache entry, replacing any previous tag set for
    /// the same key.
    pub fn register(&self, key: CacheKey, tags: BTreeSet<CacheTag>) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.t2k");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.k2t");

        if let Some(previous) = k2t.remove(&key) {
            detach(&mut t2k, &key, &previous);
        }
        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key.clone());
        }
        k2t.insert(key, tags);
    }

    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<CacheKey> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_key(&self, key: &CacheKey) -> BTreeSet<CacheTag> {
        rw_read(&self.key_to_tags, SOURCE, "tags_for_key")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a key, e.g. after eviction or invalidation.
    pub fn unregister(&self, key: &CacheKey) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.t2k");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.k2t");

        if let Some(tags) = k2t.remove(key) {
            detach(&mut t2k, key, &tags);
        }
    }

    /// Remove every key carrying any of `tags` and return them.
    pub fn take_tagged(&self, tags: &[CacheTag]) -> HashSet<CacheKey> {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "take_tagged.t2k");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "take_tagged.k2t");

        let affected: HashSet<CacheKey> = tags
            .iter()
            .filter_map(|tag| t2k.get(tag).cloned())
            .flatten()
            .collect();

        for key in &affected {
            if let Some(key_tags) = k2t.remove(key) {
                detach(&mut t2k, key, &key_tags);
            }
        }

        affected
    }

    pub fn clear(&self) {
        rw_write(&self.tag_to_keys, SOURCE, "clear.t2k").clear();
        rw_write(&self.key_to_tags, SOURCE, "clear.k2t").clear();
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(
    t2k: &mut HashMap<CacheTag, HashSet<CacheKey>>,
    key: &CacheKey,
    tags: &BTreeSet<CacheTag>,
) {
    for tag in tags {
        if let Some(keys) = t2k.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                t2k.remove(tag);
            }
        }
    }
}
