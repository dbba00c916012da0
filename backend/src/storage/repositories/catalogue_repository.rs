use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use crate::domain::models::daily_record::{MetricReference, Tag};
use crate::storage::connection::DbConnection;
use crate::storage::traits::CatalogueStorage;

/// Read-only access to the score and tag catalogues
#[derive(Clone)]
pub struct CatalogueRepository {
    db: DbConnection,
}

impl CatalogueRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogueStorage for CatalogueRepository {
    async fn resolve_score(&self, reference: MetricReference, id: i64) -> Result<Option<f64>> {
        // Table and column names come from the enum, never from input
        let query = format!(
            "SELECT score FROM {} WHERE {} = ?",
            reference.table(),
            reference.id_column()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| r.get("score")))
    }

    async fn find_tags(&self, tag_ids: &[i64]) -> Result<Vec<Tag>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Create placeholders for the IN clause
        let placeholders = tag_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query_str = format!(
            "SELECT tag_id, tag_name FROM tag WHERE tag_id IN ({}) ORDER BY tag_id",
            placeholders
        );

        let mut query = sqlx::query(&query_str);
        for id in tag_ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(self.db.pool()).await?;
        Ok(rows
            .iter()
            .map(|r| Tag {
                id: r.get("tag_id"),
                name: r.get("tag_name"),
            })
            .collect())
    }
}
