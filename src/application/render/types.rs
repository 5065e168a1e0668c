use thiserror::Error;

use crate::domain::entities::ContentNode;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("unsupported view mode `{view_mode}` for node {node_id}")]
    UnsupportedViewMode { node_id: i64, view_mode: String },
    #[error("render pipeline failed: {message}")]
    Pipeline { message: String },
}

impl RenderError {
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
        }
    }
}

/// Turns a content node into markup for a view mode. Implementations must be
/// deterministic for a given node and view mode; the render cache relies on it.
pub trait RenderPipeline: Send + Sync {
    fn render(&self, node: &ContentNode, view_mode: &str) -> Result<String, RenderError>;
}
