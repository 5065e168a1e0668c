//! Category-targeted promo embedding.
//!
//! An article's primary category selects the newest published promo that
//! targets it ([`PromoResolver`]); the promo is rendered once and cached
//! ([`RenderCacheManager`]) and spliced into the article body at its paragraph
//! offset ([`PromoInjector`]). [`EmbedPromoManager`] bundles the three behind
//! one handle.

mod category;
mod error;
mod injector;
mod render_cache;
mod resolver;

pub use category::primary_category;
pub use error::PromoError;
pub use injector::PromoInjector;
pub use render_cache::RenderCacheManager;
pub use resolver::PromoResolver;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::render::RenderPipeline;
use crate::application::repos::EntityStore;
use crate::cache::{CacheTag, PromoCaches};
use crate::domain::entities::ContentNode;
use crate::domain::types::{DEFAULT_PARAGRAPH_OFFSET, PROMO_VIEW_MODE, TermId};

/// Tags a caller attaches to output that embeds the promo for `term`, so the
/// output is rebuilt when promo targeting for the term changes.
pub fn target_term_cache_tags(term: TermId) -> Vec<CacheTag> {
    vec![CacheTag::PromoTarget(term)]
}

/// Tags to invalidate after a promo node changed.
///
/// `before` is the stored node prior to the write (absent on create), `after`
/// the node as written (absent on delete). Covers the node's own tag and the
/// target tag of both the old and new target term, so lookups that cached
/// either the old pick or "no promo" are dropped. Non-promo writes only yield
/// the node tag.
pub fn promo_changed_tags(before: Option<&ContentNode>, after: Option<&ContentNode>) -> Vec<CacheTag> {
    let mut tags = BTreeSet::new();
    for node in before.into_iter().chain(after) {
        tags.insert(CacheTag::node(node.id));
        if node.is_promo()
            && let Some(term) = node.target_term
        {
            tags.extend(target_term_cache_tags(term));
        }
    }
    tags.into_iter().collect()
}

/// Tunables for the promo pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoOptions {
    pub default_paragraph_offset: usize,
    pub view_mode: String,
}

impl Default for PromoOptions {
    fn default() -> Self {
        Self {
            default_paragraph_offset: DEFAULT_PARAGRAPH_OFFSET,
            view_mode: PROMO_VIEW_MODE.to_string(),
        }
    }
}

impl From<&crate::config::PromoSettings> for PromoOptions {
    fn from(settings: &crate::config::PromoSettings) -> Self {
        Self {
            default_paragraph_offset: settings.default_paragraph_offset,
            view_mode: settings.view_mode.clone(),
        }
    }
}

/// Entry point for hosts: resolve, render, and inject promos.
pub struct EmbedPromoManager {
    resolver: PromoResolver,
    markup: Arc<RenderCacheManager>,
    injector: PromoInjector,
}

impl EmbedPromoManager {
    pub fn new(
        store: Arc<dyn EntityStore>,
        renderer: Arc<dyn RenderPipeline>,
        caches: PromoCaches,
        options: PromoOptions,
    ) -> Self {
        let PromoCaches { lookup, render } = caches;
        let resolver = PromoResolver::new(store, lookup);
        let markup = Arc::new(RenderCacheManager::new(renderer, render, options.view_mode));
        let injector = PromoInjector::new(Arc::clone(&markup), options.default_paragraph_offset);
        Self {
            resolver,
            markup,
            injector,
        }
    }

    pub async fn resolve(&self, term: TermId) -> Result<Option<ContentNode>, PromoError> {
        self.resolver.resolve(term).await
    }

    pub async fn rendered_markup(
        &self,
        promo: Option<&ContentNode>,
    ) -> Result<Option<String>, PromoError> {
        self.markup.rendered_markup(promo).await
    }

    pub async fn inject(&self, promo: &ContentNode, text: &str) -> Result<String, PromoError> {
        self.injector.inject(promo, text).await
    }

    pub fn primary_category(&self, item: Option<&ContentNode>) -> Option<TermId> {
        primary_category(item)
    }

    pub fn target_term_cache_tags(term: TermId) -> Vec<CacheTag> {
        target_term_cache_tags(term)
    }

    /// Resolve the promo for an article's primary category in one step.
    pub async fn promo_for(
        &self,
        article: &ContentNode,
    ) -> Result<Option<(TermId, ContentNode)>, PromoError> {
        let Some(term) = primary_category(Some(article)) else {
            return Ok(None);
        };
        Ok(self.resolve(term).await?.map(|promo| (term, promo)))
    }
}
