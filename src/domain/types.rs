//! Shared domain enumerations and identifiers aligned with persisted columns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bundle name that marks a content node as an embeddable promo.
pub const PROMO_BUNDLE: &str = "embed_promo";

/// View mode used when rendering a promo for injection into a body field.
pub const PROMO_VIEW_MODE: &str = "body_embed_promo";

/// Paragraph offset applied when a promo does not set its own.
pub const DEFAULT_PARAGRAPH_OFFSET: usize = 3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TermId(pub i64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "node_status", rename_all = "snake_case")]
pub enum NodeStatus {
    Unpublished,
    #[default]
    Published,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Unpublished => "unpublished",
            NodeStatus::Published => "published",
        }
    }
}
