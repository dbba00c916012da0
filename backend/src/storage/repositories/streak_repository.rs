use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;

use crate::domain::models::streak::Streak;
use crate::storage::connection::DbConnection;
use crate::storage::traits::StreakStorage;

/// Repository for the per-student streak row
#[derive(Clone)]
pub struct StreakRepository {
    db: DbConnection,
}

impl StreakRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StreakStorage for StreakRepository {
    async fn find_streak(&self, student_id: i64) -> Result<Option<Streak>> {
        let row = sqlx::query(
            "SELECT student_id, streak_value, last_record_time FROM streak WHERE student_id = ?",
        )
        .bind(student_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| Streak {
            student_id: r.get("student_id"),
            value: r.get::<i64, _>("streak_value").max(0) as u32,
            last_record_time: r.get("last_record_time"),
        }))
    }

    async fn upsert_streak(&self, student_id: i64, value: u32, last_record_time: Option<NaiveDateTime>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO streak (student_id, streak_value, last_record_time)
            VALUES (?, ?, ?)
            ON CONFLICT (student_id) DO UPDATE SET
                streak_value = excluded.streak_value,
                last_record_time = excluded.last_record_time
            "#,
        )
        .bind(student_id)
        .bind(value as i64)
        .bind(last_record_time)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn compare_and_swap_streak(
        &self,
        student_id: i64,
        expected: Option<&Streak>,
        value: u32,
        last_record_time: Option<NaiveDateTime>,
    ) -> Result<bool> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO streak (student_id, streak_value, last_record_time)
                    VALUES (?, ?, ?)
                    ON CONFLICT (student_id) DO NOTHING
                    "#,
                )
                .bind(student_id)
                .bind(value as i64)
                .bind(last_record_time)
                .execute(self.db.pool())
                .await?
            }
            Some(current) => {
                sqlx::query(
                    r#"
                    UPDATE streak
                    SET streak_value = ?, last_record_time = ?
                    WHERE student_id = ? AND streak_value = ? AND last_record_time IS ?
                    "#,
                )
                .bind(value as i64)
                .bind(last_record_time)
                .bind(student_id)
                .bind(current.value as i64)
                .bind(current.last_record_time)
                .execute(self.db.pool())
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }
}
