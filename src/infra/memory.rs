//! In-process entity store used by the CLI fixtures mode and tests.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::application::repos::{EntityStore, NodeQuery, RepoError};
use crate::cache::{rw_read, rw_write};
use crate::domain::entities::ContentNode;
use crate::domain::types::NodeId;

const SOURCE: &str = "infra::memory::MemoryEntityStore";

#[derive(Default)]
pub struct MemoryEntityStore {
    nodes: RwLock<BTreeMap<NodeId, ContentNode>>,
    queries: AtomicUsize,
    loads: AtomicUsize,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = ContentNode>) -> Self {
        let store = Self::new();
        {
            let mut guard = rw_write(&store.nodes, SOURCE, "from_nodes");
            for node in nodes {
                guard.insert(node.id, node);
            }
        }
        store
    }

    /// Insert or replace a node, returning the previous version.
    pub fn upsert(&self, node: ContentNode) -> Option<ContentNode> {
        rw_write(&self.nodes, SOURCE, "upsert").insert(node.id, node)
    }

    pub fn remove(&self, id: NodeId) -> Option<ContentNode> {
        rw_write(&self.nodes, SOURCE, "remove").remove(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<ContentNode> {
        rw_read(&self.nodes, SOURCE, "get").get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.nodes, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `query_node_ids` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Number of `load_node` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn load_node(&self, id: NodeId) -> Result<Option<ContentNode>, RepoError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.get(id))
    }

    async fn query_node_ids(&self, query: &NodeQuery) -> Result<Vec<NodeId>, RepoError> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let guard = rw_read(&self.nodes, SOURCE, "query_node_ids");
        let mut matched: Vec<&ContentNode> =
            guard.values().filter(|node| query.matches(node)).collect();

        matched.sort_by_key(|node| Reverse((node.changed, node.id)));

        let limit = query.limit.unwrap_or(matched.len());
        let ids: Vec<NodeId> = matched.iter().take(limit).map(|node| node.id).collect();
        debug!(
            bundle = %query.bundle,
            target_term = ?query.target_term.map(|term| term.0),
            matched = ids.len(),
            "Node query served from memory"
        );
        Ok(ids)
    }
}
