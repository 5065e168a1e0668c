//! Field formatter that embeds promos into an article's body items.

use std::sync::Arc;

use serde::Serialize;
use tracing::{instrument, warn};

use crate::application::promo::{EmbedPromoManager, PromoError};
use crate::cache::CacheTag;
use crate::domain::entities::{ContentNode, TextItem};

/// One processed body item, ready for the host's text filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedText {
    pub text: String,
    pub format: String,
    pub langcode: String,
    /// Tags the host must attach to the rendered output. Empty unless a promo
    /// was injected.
    pub cache_tags: Vec<CacheTag>,
}

impl ProcessedText {
    fn plain(item: &TextItem) -> Self {
        Self {
            text: item.value.clone(),
            format: item.format.clone(),
            langcode: item.langcode.clone(),
            cache_tags: Vec::new(),
        }
    }
}

pub struct PromoFormatter {
    manager: Arc<EmbedPromoManager>,
}

impl PromoFormatter {
    pub fn new(manager: Arc<EmbedPromoManager>) -> Self {
        Self { manager }
    }

    /// Process `items` belonging to `article`.
    ///
    /// The promo for the article's primary category is resolved once and
    /// injected into every item.
    #[instrument(skip_all, fields(article = %article.id, items = items.len()))]
    pub async fn view_elements(
        &self,
        article: &ContentNode,
        items: &[TextItem],
    ) -> Result<Vec<ProcessedText>, PromoError> {
        let Some((term, promo)) = self.manager.promo_for(article).await? else {
            return Ok(items.iter().map(ProcessedText::plain).collect());
        };

        let tags = EmbedPromoManager::target_term_cache_tags(term);
        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            let text = self.manager.inject(&promo, &item.value).await?;
            elements.push(ProcessedText {
                text,
                format: item.format.clone(),
                langcode: item.langcode.clone(),
                cache_tags: tags.clone(),
            });
        }
        Ok(elements)
    }

    /// Like [`view_elements`](Self::view_elements), but a failing promo lookup
    /// or render degrades to the unmodified items instead of failing the page.
    pub async fn view_elements_best_effort(
        &self,
        article: &ContentNode,
        items: &[TextItem],
    ) -> Vec<ProcessedText> {
        match self.view_elements(article, items).await {
            Ok(elements) => elements,
            Err(error) => {
                warn!(
                    article = %article.id,
                    error = %error,
                    "Promo embedding failed; rendering body without promo"
                );
                items.iter().map(ProcessedText::plain).collect()
            }
        }
    }
}
