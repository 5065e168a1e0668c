//! Cache key and invalidation tag definitions.
//!
//! Both render to the flat string forms the host cache backend indexes on,
//! e.g. `promo:term:12` and `promo.target:12`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::types::{NodeId, TermId};

pub const PROMO_BY_TERM_PREFIX: &str = "promo:term:";
pub const RENDERED_PROMO_PREFIX: &str = "promo:rendered:";
pub const NODE_TAG_PREFIX: &str = "node:";
pub const PROMO_TARGET_TAG_PREFIX: &str = "promo.target:";

/// Identifies one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CacheKey {
    /// Promo selected for a taxonomy term (lookup cache).
    PromoByTerm(TermId),
    /// Rendered markup of a promo node (render cache).
    RenderedPromo(NodeId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::PromoByTerm(term) => write!(f, "{PROMO_BY_TERM_PREFIX}{term}"),
            CacheKey::RenderedPromo(node) => write!(f, "{RENDERED_PROMO_PREFIX}{node}"),
        }
    }
}

/// Label attached to cache entries; invalidating a tag drops every entry
/// carrying it. Serialises as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CacheTag {
    /// Content node tag. `None` renders as the bare `node:` tag written when a
    /// lookup found nothing.
    Node(Option<NodeId>),
    /// Every lookup for a term carries this tag so new or retargeted promos
    /// can clear it.
    PromoTarget(TermId),
}

impl CacheTag {
    pub fn node(id: NodeId) -> Self {
        Self::Node(Some(id))
    }

    /// Parse the string form produced by `Display`.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix(PROMO_TARGET_TAG_PREFIX) {
            return rest.parse().ok().map(|id| Self::PromoTarget(TermId(id)));
        }
        let rest = raw.strip_prefix(NODE_TAG_PREFIX)?;
        if rest.is_empty() {
            return Some(Self::Node(None));
        }
        rest.parse().ok().map(|id| Self::node(NodeId(id)))
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::Node(Some(id)) => write!(f, "{NODE_TAG_PREFIX}{id}"),
            CacheTag::Node(None) => f.write_str(NODE_TAG_PREFIX),
            CacheTag::PromoTarget(term) => write!(f, "{PROMO_TARGET_TAG_PREFIX}{term}"),
        }
    }
}

impl From<CacheTag> for String {
    fn from(tag: CacheTag) -> Self {
        tag.to_string()
    }
}

impl TryFrom<String> for CacheTag {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("unrecognised cache tag `{raw}`"))
    }
}
