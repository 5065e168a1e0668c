use time::OffsetDateTime;

use crate::application::repos::RepoError;
use crate::domain::entities::{ContentNode, TextItem};
use crate::domain::types::{NodeId, NodeStatus, TermId};

#[derive(sqlx::FromRow)]
pub(crate) struct NodeRow {
    pub(crate) id: NodeId,
    pub(crate) bundle: String,
    pub(crate) title: String,
    pub(crate) status: NodeStatus,
    pub(crate) changed: OffsetDateTime,
    pub(crate) primary_term: Option<TermId>,
    pub(crate) target_term: Option<TermId>,
    pub(crate) paragraph_offset: Option<i32>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct BodyRow {
    pub(crate) value: String,
    pub(crate) format: String,
    pub(crate) langcode: String,
}

impl From<BodyRow> for TextItem {
    fn from(row: BodyRow) -> Self {
        Self {
            value: row.value,
            format: row.format,
            langcode: row.langcode,
        }
    }
}

impl NodeRow {
    pub(crate) fn into_node(self, body: Vec<BodyRow>) -> Result<ContentNode, RepoError> {
        let paragraph_offset = self
            .paragraph_offset
            .map(u32::try_from)
            .transpose()
            .map_err(|_| {
                RepoError::integrity(format!("node {} has a negative paragraph offset", self.id))
            })?;

        Ok(ContentNode {
            id: self.id,
            bundle: self.bundle,
            title: self.title,
            status: self.status,
            changed: self.changed,
            primary_term: self.primary_term,
            target_term: self.target_term,
            paragraph_offset,
            body: body.into_iter().map(TextItem::from).collect(),
        })
    }
}
