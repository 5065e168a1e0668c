//! Rendered promo markup, cached per promo node.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::application::render::RenderPipeline;
use crate::cache::{CacheKey, CacheTag, Lifetime, TagCache};
use crate::domain::entities::ContentNode;

use super::error::PromoError;

pub struct RenderCacheManager {
    renderer: Arc<dyn RenderPipeline>,
    render_cache: Arc<dyn TagCache>,
    view_mode: String,
}

impl RenderCacheManager {
    pub fn new(
        renderer: Arc<dyn RenderPipeline>,
        render_cache: Arc<dyn TagCache>,
        view_mode: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            render_cache,
            view_mode: view_mode.into(),
        }
    }

    pub fn view_mode(&self) -> &str {
        &self.view_mode
    }

    /// Markup for `promo`, rendering and caching it on first use.
    ///
    /// Returns `Ok(None)` without touching the cache when `promo` is absent or
    /// is not a promo node.
    pub async fn rendered_markup(
        &self,
        promo: Option<&ContentNode>,
    ) -> Result<Option<String>, PromoError> {
        let Some(promo) = promo.filter(|node| node.is_promo()) else {
            return Ok(None);
        };

        let key = CacheKey::RenderedPromo(promo.id);
        if let Some(entry) = self.render_cache.get(&key).await? {
            debug!(key = %key, "Promo markup served from cache");
            return Ok(Some(entry.data));
        }

        let markup = self.renderer.render(promo, &self.view_mode)?;
        counter!("promo_embed_render_total").increment(1);

        let tags: BTreeSet<CacheTag> = BTreeSet::from([CacheTag::node(promo.id)]);
        self.render_cache
            .set(key.clone(), markup.clone(), Lifetime::Permanent, tags)
            .await?;

        debug!(key = %key, view_mode = %self.view_mode, "Promo markup rendered and cached");
        Ok(Some(markup))
    }
}
