//! Cache configuration.
//!
//! Sizes the in-process lookup and render caches via the `[cache]` section.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_LOOKUP_LIMIT: usize = 1000;
const DEFAULT_RENDER_LIMIT: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve lookups and rendered markup from cache. When disabled every call
    /// goes to the entity store and render pipeline.
    pub enabled: bool,
    /// Maximum term → promo entries in the lookup cache.
    pub lookup_limit: usize,
    /// Maximum rendered promos in the render cache.
    pub render_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            render_limit: DEFAULT_RENDER_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            lookup_limit: settings.lookup_limit,
            render_limit: settings.render_limit,
        }
    }
}

impl CacheConfig {
    /// Returns the lookup limit as NonZeroUsize, clamping to 1 if zero.
    pub fn lookup_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.lookup_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the render limit as NonZeroUsize, clamping to 1 if zero.
    pub fn render_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.render_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
