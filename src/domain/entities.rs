//! Domain entities mirrored from the content store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{NodeId, NodeStatus, PROMO_BUNDLE, TermId};

/// One value of a formatted long-text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    pub value: String,
    #[serde(default = "default_text_format")]
    pub format: String,
    #[serde(default = "default_langcode")]
    pub langcode: String,
}

impl TextItem {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: default_text_format(),
            langcode: default_langcode(),
        }
    }
}

fn default_text_format() -> String {
    "basic_html".to_string()
}

fn default_langcode() -> String {
    "en".to_string()
}

/// A content node: articles and promos share the same record shape and are
/// told apart by `bundle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: NodeId,
    pub bundle: String,
    pub title: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub changed: OffsetDateTime,
    /// Single-valued category reference of an article.
    #[serde(default)]
    pub primary_term: Option<TermId>,
    /// Category a promo advertises itself into.
    #[serde(default)]
    pub target_term: Option<TermId>,
    #[serde(default)]
    pub paragraph_offset: Option<u32>,
    #[serde(default)]
    pub body: Vec<TextItem>,
}

impl ContentNode {
    pub fn is_promo(&self) -> bool {
        self.bundle == PROMO_BUNDLE
    }

    pub fn is_published(&self) -> bool {
        self.status == NodeStatus::Published
    }

    /// True when this node can be picked for `term` by the promo lookup.
    pub fn is_eligible_promo_for(&self, term: TermId) -> bool {
        self.is_promo() && self.is_published() && self.target_term == Some(term)
    }
}
