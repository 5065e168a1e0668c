//! Cache trigger service.
//!
//! Write paths call into the trigger after a node is saved or deleted; it
//! derives the affected tags and invalidates them in both promo cache bins.

use tracing::debug;

use crate::application::promo::promo_changed_tags;
use crate::domain::entities::ContentNode;

use super::keys::CacheTag;
use super::store::CacheError;
use super::PromoCaches;

/// Invalidates promo cache entries in response to content writes.
///
/// # Usage
///
/// ```ignore
/// // After a successful node update:
/// let previous = store.upsert(node.clone());
/// trigger.node_saved(previous.as_ref(), &node).await?;
/// ```
pub struct CacheTrigger {
    caches: PromoCaches,
}

impl CacheTrigger {
    pub fn new(caches: PromoCaches) -> Self {
        Self { caches }
    }

    /// Invalidate `tags` in both bins, returning the number of dropped entries.
    pub async fn invalidate(&self, tags: &[CacheTag]) -> Result<usize, CacheError> {
        if tags.is_empty() {
            return Ok(0);
        }
        let dropped = self.caches.invalidate_tags(tags).await?;
        debug!(
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            dropped,
            "Cache tags invalidated"
        );
        Ok(dropped)
    }

    /// A node was created or updated. `before` is the version stored prior to
    /// the write.
    pub async fn node_saved(
        &self,
        before: Option<&ContentNode>,
        after: &ContentNode,
    ) -> Result<usize, CacheError> {
        self.invalidate(&promo_changed_tags(before, Some(after))).await
    }

    /// A node was deleted.
    pub async fn node_deleted(&self, before: &ContentNode) -> Result<usize, CacheError> {
        self.invalidate(&promo_changed_tags(Some(before), None)).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::cache::{CacheKey, Lifetime, MemoryTagCache, TagCache};
    use crate::domain::types::{NodeId, NodeStatus, PROMO_BUNDLE, TermId};

    fn promo(id: i64, target: i64) -> ContentNode {
        ContentNode {
            id: NodeId(id),
            bundle: PROMO_BUNDLE.to_string(),
            title: "Promo".to_string(),
            status: NodeStatus::Published,
            changed: datetime!(2024-01-01 00:00 UTC),
            primary_term: None,
            target_term: Some(TermId(target)),
            paragraph_offset: None,
            body: Vec::new(),
        }
    }

    fn caches() -> (Arc<MemoryTagCache>, Arc<MemoryTagCache>, PromoCaches) {
        let limit = NonZeroUsize::new(8).expect("non-zero");
        let lookup = Arc::new(MemoryTagCache::new("lookup", limit));
        let render = Arc::new(MemoryTagCache::new("render", limit));
        let caches = PromoCaches::new(lookup.clone(), render.clone());
        (lookup, render, caches)
    }

    #[tokio::test]
    async fn retargeting_drops_lookups_for_both_terms() {
        let (lookup, render, caches) = caches();
        for term in [1, 2] {
            lookup
                .set(
                    CacheKey::PromoByTerm(TermId(term)),
                    String::new(),
                    Lifetime::Permanent,
                    BTreeSet::from([CacheTag::PromoTarget(TermId(term)), CacheTag::Node(None)]),
                )
                .await
                .expect("set");
        }
        render
            .set(
                CacheKey::RenderedPromo(NodeId(5)),
                "<aside></aside>".to_string(),
                Lifetime::Permanent,
                BTreeSet::from([CacheTag::node(NodeId(5))]),
            )
            .await
            .expect("set");

        let trigger = CacheTrigger::new(caches);
        let dropped = trigger
            .node_saved(Some(&promo(5, 1)), &promo(5, 2))
            .await
            .expect("invalidate");

        assert_eq!(dropped, 3);
        assert!(lookup.is_empty());
        assert!(render.is_empty());
    }

    #[tokio::test]
    async fn empty_tag_list_is_a_no_op() {
        let (_, _, caches) = caches();
        let trigger = CacheTrigger::new(caches);
        assert_eq!(trigger.invalidate(&[]).await.expect("invalidate"), 0);
    }
}
