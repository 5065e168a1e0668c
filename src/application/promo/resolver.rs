//! Term → promo resolution backed by the lookup cache.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument};

use crate::application::repos::{EntityStore, NodeQuery};
use crate::cache::{CacheKey, CacheTag, Lifetime, TagCache};
use crate::domain::entities::ContentNode;
use crate::domain::types::{NodeId, TermId};

use super::error::PromoError;
use super::target_term_cache_tags;

pub struct PromoResolver {
    store: Arc<dyn EntityStore>,
    lookup_cache: Arc<dyn TagCache>,
}

impl PromoResolver {
    pub fn new(store: Arc<dyn EntityStore>, lookup_cache: Arc<dyn TagCache>) -> Self {
        Self {
            store,
            lookup_cache,
        }
    }

    /// The newest published promo targeting `term`, if any.
    ///
    /// The lookup cache only decides which node id to load; the loaded node is
    /// still checked to be a promo, so a stale id never leaks an article.
    #[instrument(skip_all, fields(term = %term))]
    pub async fn resolve(&self, term: TermId) -> Result<Option<ContentNode>, PromoError> {
        let Some(node_id) = self.promo_id_for_term(term).await? else {
            return Ok(None);
        };

        match self.store.load_node(node_id).await? {
            Some(node) if node.is_promo() => Ok(Some(node)),
            Some(node) => {
                debug!(node_id = %node_id, bundle = %node.bundle, "Selected node is not a promo");
                Ok(None)
            }
            None => {
                debug!(node_id = %node_id, "Selected promo no longer exists");
                Ok(None)
            }
        }
    }

    /// Node id of the promo picked for `term`, served from the lookup cache
    /// when present. Misses are cached too, as an empty value.
    pub async fn promo_id_for_term(&self, term: TermId) -> Result<Option<NodeId>, PromoError> {
        let key = CacheKey::PromoByTerm(term);
        if let Some(entry) = self.lookup_cache.get(&key).await? {
            debug!(key = %key, value = %entry.data, "Promo lookup served from cache");
            return decode_lookup(&key, &entry.data);
        }

        let query = NodeQuery::latest_promo_for(term);
        let found = self.store.query_node_ids(&query).await?.into_iter().next();
        counter!("promo_embed_lookup_query_total").increment(1);

        self.lookup_cache
            .set(
                key.clone(),
                encode_lookup(found),
                Lifetime::Permanent,
                lookup_tags(term, found),
            )
            .await?;

        debug!(
            key = %key,
            promo = ?found.map(|id| id.0),
            "Promo lookup queried and cached"
        );
        Ok(found)
    }
}

/// Tags for a lookup entry: the selected node (bare `node:` when nothing was
/// found) and the term's target tag.
pub(crate) fn lookup_tags(term: TermId, found: Option<NodeId>) -> BTreeSet<CacheTag> {
    let mut tags: BTreeSet<CacheTag> = target_term_cache_tags(term).into_iter().collect();
    tags.insert(CacheTag::Node(found));
    tags
}

fn encode_lookup(found: Option<NodeId>) -> String {
    found.map(|id| id.to_string()).unwrap_or_default()
}

fn decode_lookup(key: &CacheKey, raw: &str) -> Result<Option<NodeId>, PromoError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(|id| Some(NodeId(id)))
        .map_err(|_| PromoError::CorruptLookup {
            key: key.to_string(),
            value: raw.to_string(),
        })
}
