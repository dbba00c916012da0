//! Fixtures shared by repository and service tests.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::Row;
use std::sync::Arc;

use super::connection::DbConnection;
use crate::domain::models::daily_record::DailyRecordFields;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    date(year, month, day).and_hms_opt(hour, 0, 0).expect("valid test time")
}

/// Record fields with the given mood id and every other reference set to `other`
pub fn fields(mood_id: i64, other: i64) -> DailyRecordFields {
    DailyRecordFields {
        mood_id,
        exercise_id: other,
        sleep_id: other,
        socialisation_id: other,
        productivity_score: other as f64,
    }
}

/// In-memory database plus helpers to populate it
pub struct TestFixture {
    pub db: DbConnection,
}

impl TestFixture {
    pub async fn new() -> Self {
        let db = DbConnection::init_test().await.expect("Failed to init test DB");
        Self { db }
    }

    pub fn connection(&self) -> Arc<DbConnection> {
        Arc::new(self.db.clone())
    }

    /// Insert a student into the given cohort, creating course and year rows as needed
    pub async fn student(&self, student_number: &str, course_id: i64, academic_year_id: i64) -> i64 {
        sqlx::query("INSERT OR IGNORE INTO course (course_id, course_name) VALUES (?, ?)")
            .bind(course_id)
            .bind(format!("Course {}", course_id))
            .execute(self.db.pool())
            .await
            .expect("Failed to insert course");
        sqlx::query("INSERT OR IGNORE INTO academic_year (academic_year_id, year_label) VALUES (?, ?)")
            .bind(academic_year_id)
            .bind(format!("Year {}", academic_year_id))
            .execute(self.db.pool())
            .await
            .expect("Failed to insert academic year");

        let result = sqlx::query(
            "INSERT INTO student (name, student_number, email, course_id, academic_year_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format!("Student {}", student_number))
        .bind(student_number)
        .bind(format!("{}@students.example.ac.uk", student_number.to_lowercase()))
        .bind(course_id)
        .bind(academic_year_id)
        .execute(self.db.pool())
        .await
        .expect("Failed to insert student");
        result.last_insert_rowid()
    }

    pub async fn staff(&self, name: &str, email: &str) -> i64 {
        let result = sqlx::query("INSERT INTO staff (name, email) VALUES (?, ?)")
            .bind(name)
            .bind(email)
            .execute(self.db.pool())
            .await
            .expect("Failed to insert staff");
        result.last_insert_rowid()
    }

    /// Daily record at 10:00 on `day`; see [`fields`] for the references used
    pub async fn record(&self, student_id: i64, day: NaiveDate, mood_id: i64, other: i64) -> i64 {
        self.record_with(student_id, day, &fields(mood_id, other)).await
    }

    pub async fn record_with(&self, student_id: i64, day: NaiveDate, fields: &DailyRecordFields) -> i64 {
        let recorded_at = day.and_hms_opt(10, 0, 0).expect("valid test time");
        let row = sqlx::query(
            r#"
            INSERT INTO daily_record (
                student_id, record_date, daily_record_timestamp,
                mood_id, exercise_id, sleep_id, socialisation_id, productivity_score
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING daily_record_id
            "#,
        )
        .bind(student_id)
        .bind(day)
        .bind(recorded_at)
        .bind(fields.mood_id)
        .bind(fields.exercise_id)
        .bind(fields.sleep_id)
        .bind(fields.socialisation_id)
        .bind(fields.productivity_score)
        .fetch_one(self.db.pool())
        .await
        .expect("Failed to insert daily record");
        row.get("daily_record_id")
    }

    pub async fn quick_track(&self, student_id: i64, recorded_at: NaiveDateTime, mood_id: i64) -> i64 {
        let result = sqlx::query(
            "INSERT INTO quick_track (student_id, mood_id, quick_track_timestamp) VALUES (?, ?, ?)",
        )
        .bind(student_id)
        .bind(mood_id)
        .bind(recorded_at)
        .execute(self.db.pool())
        .await
        .expect("Failed to insert quick track");
        result.last_insert_rowid()
    }

    pub async fn streak(&self, student_id: i64, value: u32, last_record_time: Option<NaiveDateTime>) {
        sqlx::query("INSERT OR REPLACE INTO streak (student_id, streak_value, last_record_time) VALUES (?, ?, ?)")
            .bind(student_id)
            .bind(value as i64)
            .bind(last_record_time)
            .execute(self.db.pool())
            .await
            .expect("Failed to insert streak");
    }

    pub async fn assignment(&self, student_id: i64, name: &str, deadline: NaiveDateTime) -> i64 {
        let result = sqlx::query(
            "INSERT INTO assignment (student_id, assignment_name, assignment_deadline) VALUES (?, ?, ?)",
        )
        .bind(student_id)
        .bind(name)
        .bind(deadline)
        .execute(self.db.pool())
        .await
        .expect("Failed to insert assignment");
        result.last_insert_rowid()
    }

    pub async fn tag_record(&self, daily_record_id: i64, tag_name: &str) {
        sqlx::query(
            "INSERT INTO daily_record_tag (daily_record_id, tag_id) SELECT ?, tag_id FROM tag WHERE tag_name = ?",
        )
        .bind(daily_record_id)
        .bind(tag_name)
        .execute(self.db.pool())
        .await
        .expect("Failed to tag record");
    }

    pub async fn tag_ids_of(&self, daily_record_id: i64) -> Vec<i64> {
        sqlx::query("SELECT tag_id FROM daily_record_tag WHERE daily_record_id = ? ORDER BY tag_id")
            .bind(daily_record_id)
            .fetch_all(self.db.pool())
            .await
            .expect("Failed to read tags")
            .iter()
            .map(|r| r.get("tag_id"))
            .collect()
    }

    pub async fn streak_value(&self, student_id: i64) -> Option<i64> {
        sqlx::query("SELECT streak_value FROM streak WHERE student_id = ?")
            .bind(student_id)
            .fetch_optional(self.db.pool())
            .await
            .expect("Failed to read streak")
            .map(|r| r.get("streak_value"))
    }
}
