use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::Row;

use crate::domain::models::daily_record::{DailyRecord, DailyRecordFields, MergedRecord, RecordScope};
use crate::storage::connection::DbConnection;
use crate::storage::traits::DailyRecordStorage;

/// Repository for daily records, their tags and the merged analytics view
#[derive(Clone)]
pub struct DailyRecordRepository {
    db: DbConnection,
}

impl DailyRecordRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DailyRecordStorage for DailyRecordRepository {
    async fn find_daily_record(&self, student_id: i64, date: NaiveDate) -> Result<Option<DailyRecord>> {
        let row = sqlx::query(
            r#"
            SELECT daily_record_id, student_id, record_date, daily_record_timestamp,
                   mood_id, exercise_id, sleep_id, socialisation_id, productivity_score
            FROM daily_record
            WHERE student_id = ? AND record_date = ?
            "#,
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| DailyRecord {
            id: r.get("daily_record_id"),
            student_id: r.get("student_id"),
            record_date: r.get("record_date"),
            recorded_at: r.get("daily_record_timestamp"),
            fields: DailyRecordFields {
                mood_id: r.get("mood_id"),
                exercise_id: r.get("exercise_id"),
                sleep_id: r.get("sleep_id"),
                socialisation_id: r.get("socialisation_id"),
                productivity_score: r.get("productivity_score"),
            },
        }))
    }

    async fn find_latest_record_date_before(&self, student_id: i64, date: NaiveDate) -> Result<Option<NaiveDate>> {
        let row = sqlx::query(
            r#"
            SELECT record_date
            FROM daily_record
            WHERE student_id = ? AND record_date < ?
            ORDER BY record_date DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| r.get("record_date")))
    }

    async fn upsert_daily_record(
        &self,
        student_id: i64,
        date: NaiveDate,
        fields: &DailyRecordFields,
        recorded_at: NaiveDateTime,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO daily_record (
                student_id, record_date, daily_record_timestamp,
                mood_id, exercise_id, sleep_id, socialisation_id, productivity_score
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (student_id, record_date) DO UPDATE SET
                daily_record_timestamp = excluded.daily_record_timestamp,
                mood_id = excluded.mood_id,
                exercise_id = excluded.exercise_id,
                sleep_id = excluded.sleep_id,
                socialisation_id = excluded.socialisation_id,
                productivity_score = excluded.productivity_score
            RETURNING daily_record_id
            "#,
        )
        .bind(student_id)
        .bind(date)
        .bind(recorded_at)
        .bind(fields.mood_id)
        .bind(fields.exercise_id)
        .bind(fields.sleep_id)
        .bind(fields.socialisation_id)
        .bind(fields.productivity_score)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("daily_record_id"))
    }

    async fn set_tags(&self, daily_record_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM daily_record_tag WHERE daily_record_id = ?")
            .bind(daily_record_id)
            .execute(&mut *tx)
            .await?;

        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO daily_record_tag (daily_record_id, tag_id) VALUES (?, ?)")
                .bind(daily_record_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query_records_in_window(
        &self,
        scope: &RecordScope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MergedRecord>> {
        // Every filter is a bound parameter; `? IS NULL` disables it
        let rows = sqlx::query(
            r#"
            SELECT s.student_id, s.course_id, s.academic_year_id,
                   dr.daily_record_timestamp AS recorded_at,
                   m.score AS mood_score,
                   e.score AS exercise_score,
                   sl.score AS sleep_score,
                   so.score AS socialisation_score,
                   dr.productivity_score AS productivity_score
            FROM daily_record dr
            JOIN student s ON s.student_id = dr.student_id
            LEFT JOIN moods m ON m.mood_id = dr.mood_id
            LEFT JOIN exercise e ON e.exercise_id = dr.exercise_id
            LEFT JOIN sleep sl ON sl.sleep_id = dr.sleep_id
            LEFT JOIN socialisation so ON so.socialisation_id = dr.socialisation_id
            WHERE dr.record_date BETWEEN ? AND ?
              AND (? IS NULL OR s.student_id = ?)
              AND (? IS NULL OR s.course_id = ?)
              AND (? IS NULL OR s.academic_year_id = ?)
            UNION ALL
            SELECT s.student_id, s.course_id, s.academic_year_id,
                   qt.quick_track_timestamp AS recorded_at,
                   m.score AS mood_score,
                   NULL AS exercise_score,
                   NULL AS sleep_score,
                   NULL AS socialisation_score,
                   NULL AS productivity_score
            FROM quick_track qt
            JOIN student s ON s.student_id = qt.student_id
            LEFT JOIN moods m ON m.mood_id = qt.mood_id
            WHERE date(qt.quick_track_timestamp) BETWEEN ? AND ?
              AND (? IS NULL OR s.student_id = ?)
              AND (? IS NULL OR s.course_id = ?)
              AND (? IS NULL OR s.academic_year_id = ?)
            ORDER BY recorded_at
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(scope.student_id)
        .bind(scope.student_id)
        .bind(scope.course_id)
        .bind(scope.course_id)
        .bind(scope.academic_year_id)
        .bind(scope.academic_year_id)
        .bind(start)
        .bind(end)
        .bind(scope.student_id)
        .bind(scope.student_id)
        .bind(scope.course_id)
        .bind(scope.course_id)
        .bind(scope.academic_year_id)
        .bind(scope.academic_year_id)
        .fetch_all(self.db.pool())
        .await?;

        let records = rows
            .iter()
            .map(|row| MergedRecord {
                student_id: row.get("student_id"),
                course_id: row.get("course_id"),
                academic_year_id: row.get("academic_year_id"),
                recorded_at: row.get("recorded_at"),
                mood_score: row.get("mood_score"),
                exercise_score: row.get("exercise_score"),
                sleep_score: row.get("sleep_score"),
                socialisation_score: row.get("socialisation_score"),
                productivity_score: row.get("productivity_score"),
            })
            .collect();

        Ok(records)
    }

    async fn count_students_recorded_on(&self, date: NaiveDate) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT student_id) AS recorded FROM daily_record WHERE record_date = ?",
        )
        .bind(date)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get::<i64, _>("recorded") as u32)
    }
}
