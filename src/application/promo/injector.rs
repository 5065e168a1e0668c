//! Splices rendered promo markup into body text.

use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::domain::entities::ContentNode;
use crate::domain::paragraphs::split_paragraphs;

use super::error::PromoError;
use super::render_cache::RenderCacheManager;

pub struct PromoInjector {
    markup: Arc<RenderCacheManager>,
    default_offset: usize,
}

impl PromoInjector {
    pub fn new(markup: Arc<RenderCacheManager>, default_offset: usize) -> Self {
        Self {
            markup,
            default_offset,
        }
    }

    /// Fragment index the promo is inserted at: the promo's own offset, or the
    /// configured default.
    pub fn offset_for(&self, promo: &ContentNode) -> usize {
        // An offset past the address space can never be reached by a body.
        promo.paragraph_offset.map_or(self.default_offset, |offset| {
            usize::try_from(offset).unwrap_or(usize::MAX)
        })
    }

    /// Insert the promo's markup as a new fragment at its paragraph offset.
    ///
    /// Text with fewer fragments than the offset is returned unchanged,
    /// byte-for-byte, and the promo is never rendered. Otherwise the combined
    /// text has trailing whitespace trimmed.
    pub async fn inject(&self, promo: &ContentNode, text: &str) -> Result<String, PromoError> {
        let offset = self.offset_for(promo);
        let fragments = split_paragraphs(text);

        if fragments.len() < offset {
            debug!(
                promo_id = %promo.id,
                offset,
                fragments = fragments.len(),
                "Body too short for promo; left unchanged"
            );
            return Ok(text.to_string());
        }

        let Some(markup) = self.markup.rendered_markup(Some(promo)).await? else {
            return Ok(fragments.concat().trim_end().to_string());
        };

        let (head, tail) = fragments.split_at(offset);
        let mut combined = String::with_capacity(text.len() + markup.len());
        for fragment in head {
            combined.push_str(fragment);
        }
        combined.push_str(&markup);
        for fragment in tail {
            combined.push_str(fragment);
        }

        counter!("promo_embed_injected_total").increment(1);
        debug!(
            promo_id = %promo.id,
            offset,
            fragments = fragments.len(),
            "Promo injected"
        );

        let trimmed_len = combined.trim_end().len();
        combined.truncate(trimmed_len);
        Ok(combined)
    }
}
