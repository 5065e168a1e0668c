//! TOML node fixtures for the in-memory store.
//!
//! ```toml
//! [[nodes]]
//! id = 10
//! bundle = "embed_promo"
//! title = "Spring sale"
//! changed = "2024-03-01T09:00:00Z"
//! target_term = 7
//! paragraph_offset = 2
//!
//! [[nodes.body]]
//! value = "Everything **half price**."
//! format = "markdown"
//! ```
//!
//! `changed` is an RFC 3339 string, not a bare TOML datetime.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::domain::entities::ContentNode;

use super::error::InfraError;
use super::memory::MemoryEntityStore;

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    nodes: Vec<ContentNode>,
}

/// Parse fixture TOML. `origin` names the source in error messages.
pub fn parse_fixture(origin: &str, raw: &str) -> Result<Vec<ContentNode>, InfraError> {
    let file: FixtureFile =
        toml::from_str(raw).map_err(|err| InfraError::fixture(origin, err.to_string()))?;

    let mut seen = std::collections::BTreeSet::new();
    for node in &file.nodes {
        if !seen.insert(node.id) {
            return Err(InfraError::fixture(
                origin,
                format!("node id {} appears more than once", node.id),
            ));
        }
    }
    Ok(file.nodes)
}

pub async fn load_fixture(path: &Path) -> Result<Vec<ContentNode>, InfraError> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_fixture(&path.display().to_string(), &raw)
}

/// Build a memory store populated from the fixture at `path`.
pub async fn load_store(path: &Path) -> Result<MemoryEntityStore, InfraError> {
    let nodes = load_fixture(path).await?;
    info!(path = %path.display(), nodes = nodes.len(), "Loaded node fixtures");
    Ok(MemoryEntityStore::from_nodes(nodes))
}
