//! Promo cache system
//!
//! Two cache bins back the promo pipeline:
//!
//! - **Lookup cache**: `promo:term:<termId>` → id of the promo picked for the
//!   term, or an empty value when none was eligible.
//! - **Render cache**: `promo:rendered:<promoId>` → rendered promo markup.
//!
//! Entries are written with tags (`node:<id>`, `promo.target:<termId>`) and
//! live until the host invalidates one of those tags. The core never expires
//! entries on its own.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! lookup_limit = 1000
//! render_limit = 500
//! ```

mod config;
mod keys;
mod lock;
mod registry;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use keys::{
    CacheKey, CacheTag, NODE_TAG_PREFIX, PROMO_BY_TERM_PREFIX, PROMO_TARGET_TAG_PREFIX,
    RENDERED_PROMO_PREFIX,
};
pub(crate) use lock::{rw_read, rw_write};
pub use registry::TagRegistry;
pub use store::{CacheEntry, CacheError, Lifetime, MemoryTagCache, NullTagCache, TagCache};
pub use trigger::CacheTrigger;

use std::sync::Arc;

pub const LOOKUP_BIN: &str = "lookup";
pub const RENDER_BIN: &str = "render";

/// The pair of cache bins used by the promo pipeline.
#[derive(Clone)]
pub struct PromoCaches {
    pub lookup: Arc<dyn TagCache>,
    pub render: Arc<dyn TagCache>,
}

impl PromoCaches {
    pub fn new(lookup: Arc<dyn TagCache>, render: Arc<dyn TagCache>) -> Self {
        Self { lookup, render }
    }

    /// Build in-process bins sized by `config`, or no-op bins when caching is
    /// disabled.
    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::new(Arc::new(NullTagCache), Arc::new(NullTagCache));
        }
        Self::new(
            Arc::new(MemoryTagCache::new(LOOKUP_BIN, config.lookup_limit_non_zero())),
            Arc::new(MemoryTagCache::new(RENDER_BIN, config.render_limit_non_zero())),
        )
    }

    /// Invalidate `tags` in both bins; returns the total number of dropped
    /// entries.
    pub async fn invalidate_tags(&self, tags: &[CacheTag]) -> Result<usize, CacheError> {
        let lookup = self.lookup.invalidate_tags(tags).await?;
        let render = self.render.invalidate_tags(tags).await?;
        Ok(lookup + render)
    }
}
