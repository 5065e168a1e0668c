use async_trait::async_trait;
use sqlx::QueryBuilder;
use tracing::debug;

use crate::application::repos::{EntityStore, NodeQuery, RepoError};
use crate::domain::entities::ContentNode;
use crate::domain::types::NodeId;

use super::PostgresEntityStore;
use super::types::{BodyRow, NodeRow};
use crate::infra::db::map_sqlx_error;

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn load_node(&self, id: NodeId) -> Result<Option<ContentNode>, RepoError> {
        let row = sqlx::query_as::<_, NodeRow>(
            "SELECT id, bundle, title, status, changed, primary_term, target_term, paragraph_offset \
             FROM nodes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body = sqlx::query_as::<_, BodyRow>(
            "SELECT value, format, langcode FROM node_body WHERE node_id = $1 ORDER BY delta",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.into_node(body).map(Some)
    }

    async fn query_node_ids(&self, query: &NodeQuery) -> Result<Vec<NodeId>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT n.id FROM nodes n WHERE n.bundle = ");
        qb.push_bind(&query.bundle);

        if let Some(status) = query.status {
            qb.push(" AND n.status = ");
            qb.push_bind(status);
        }

        if let Some(term) = query.target_term {
            qb.push(" AND n.target_term = ");
            qb.push_bind(term);
        }

        qb.push(" ORDER BY n.changed DESC, n.id DESC");

        if let Some(limit) = query.limit {
            let limit = i64::try_from(limit)
                .map_err(|_| RepoError::from_persistence("limit exceeds supported range"))?;
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        let ids: Vec<NodeId> = qb
            .build_query_scalar()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        debug!(
            bundle = %query.bundle,
            target_term = ?query.target_term.map(|term| term.0),
            matched = ids.len(),
            "Node query served from postgres"
        );
        Ok(ids)
    }
}
