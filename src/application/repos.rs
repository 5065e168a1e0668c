//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::ContentNode;
use crate::domain::types::{NodeId, NodeStatus, PROMO_BUNDLE, TermId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Filtered node id query.
///
/// Results come most recently changed first; equal timestamps fall back to
/// the higher node id so the pick is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    pub bundle: String,
    pub status: Option<NodeStatus>,
    pub target_term: Option<TermId>,
    pub limit: Option<usize>,
}

impl NodeQuery {
    /// The newest published promo targeting `term`.
    pub fn latest_promo_for(term: TermId) -> Self {
        Self {
            bundle: PROMO_BUNDLE.to_string(),
            status: Some(NodeStatus::Published),
            target_term: Some(term),
            limit: Some(1),
        }
    }

    /// Whether `node` passes every filter of this query.
    pub fn matches(&self, node: &ContentNode) -> bool {
        node.bundle == self.bundle
            && self.status.is_none_or(|status| node.status == status)
            && self
                .target_term
                .is_none_or(|term| node.target_term == Some(term))
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load_node(&self, id: NodeId) -> Result<Option<ContentNode>, RepoError>;

    async fn query_node_ids(&self, query: &NodeQuery) -> Result<Vec<NodeId>, RepoError>;
}
