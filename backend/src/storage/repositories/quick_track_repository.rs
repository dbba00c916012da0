use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;

use crate::storage::connection::DbConnection;
use crate::storage::traits::QuickTrackStorage;

/// Repository for quick-track mood pings
#[derive(Clone)]
pub struct QuickTrackRepository {
    db: DbConnection,
}

impl QuickTrackRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuickTrackStorage for QuickTrackRepository {
    async fn latest_quick_track_time(&self, student_id: i64) -> Result<Option<NaiveDateTime>> {
        let row = sqlx::query(
            r#"
            SELECT quick_track_timestamp
            FROM quick_track
            WHERE student_id = ?
            ORDER BY quick_track_timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| r.get("quick_track_timestamp")))
    }

    async fn insert_quick_track(&self, student_id: i64, mood_id: i64, recorded_at: NaiveDateTime) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO quick_track (student_id, mood_id, quick_track_timestamp) VALUES (?, ?, ?)",
        )
        .bind(student_id)
        .bind(mood_id)
        .bind(recorded_at)
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{at, TestFixture};

    #[tokio::test]
    async fn test_latest_quick_track_time() {
        let fixture = TestFixture::new().await;
        let student = fixture.student("S1", 1, 1).await;
        let repo = QuickTrackRepository::new(fixture.db.clone());

        assert_eq!(repo.latest_quick_track_time(student).await.expect("query"), None);

        repo.insert_quick_track(student, 3, at(2024, 3, 1, 9)).await.expect("insert");
        repo.insert_quick_track(student, 4, at(2024, 3, 1, 14)).await.expect("insert");

        assert_eq!(
            repo.latest_quick_track_time(student).await.expect("query"),
            Some(at(2024, 3, 1, 14))
        );
    }
}
