use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::cohort::{
    Assignment, CohortKey, StaffMember, StudentActivity, StudentProfile, TagCount,
};
use crate::storage::connection::DbConnection;
use crate::storage::traits::CohortStorage;

/// Repository for student, staff and cohort level queries
#[derive(Clone)]
pub struct CohortRepository {
    db: DbConnection,
}

impl CohortRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn student_from_row(row: &SqliteRow) -> StudentProfile {
        StudentProfile {
            id: row.get("student_id"),
            name: row.get("name"),
            student_number: row.get("student_number"),
            email: row.get("email"),
            cohort: CohortKey {
                course_id: row.get("course_id"),
                academic_year_id: row.get("academic_year_id"),
            },
        }
    }
}

#[async_trait]
impl CohortStorage for CohortRepository {
    async fn list_students(&self) -> Result<Vec<StudentProfile>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, name, student_number, email, course_id, academic_year_id
            FROM student
            ORDER BY student_id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(Self::student_from_row).collect())
    }

    async fn find_student(&self, student_id: i64) -> Result<Option<StudentProfile>> {
        let row = sqlx::query(
            r#"
            SELECT student_id, name, student_number, email, course_id, academic_year_id
            FROM student
            WHERE student_id = ?
            "#,
        )
        .bind(student_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(Self::student_from_row))
    }

    async fn list_student_activity(&self) -> Result<Vec<StudentActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT s.student_id, s.name, s.student_number, s.email, s.course_id, s.academic_year_id,
                   (SELECT MAX(dr.daily_record_timestamp) FROM daily_record dr
                     WHERE dr.student_id = s.student_id) AS last_daily_record,
                   (SELECT MAX(qt.quick_track_timestamp) FROM quick_track qt
                     WHERE qt.student_id = s.student_id) AS last_quick_track
            FROM student s
            ORDER BY s.name, s.student_id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| StudentActivity {
                student: Self::student_from_row(row),
                last_daily_record: row.get::<Option<NaiveDateTime>, _>("last_daily_record"),
                last_quick_track: row.get::<Option<NaiveDateTime>, _>("last_quick_track"),
            })
            .collect())
    }

    async fn cohort_sizes(&self) -> Result<Vec<(CohortKey, u32)>> {
        let rows = sqlx::query(
            r#"
            SELECT course_id, academic_year_id, COUNT(*) AS student_count
            FROM student
            GROUP BY course_id, academic_year_id
            ORDER BY course_id, academic_year_id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let key = CohortKey {
                    course_id: row.get("course_id"),
                    academic_year_id: row.get("academic_year_id"),
                };
                (key, row.get::<i64, _>("student_count") as u32)
            })
            .collect())
    }

    async fn tag_counts_by_cohort(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TagCount>> {
        let rows = sqlx::query(
            r#"
            SELECT s.course_id, s.academic_year_id, t.tag_name,
                   COUNT(DISTINCT s.student_id) AS student_count
            FROM daily_record_tag drt
            JOIN daily_record dr ON dr.daily_record_id = drt.daily_record_id
            JOIN student s ON s.student_id = dr.student_id
            JOIN tag t ON t.tag_id = drt.tag_id
            WHERE dr.record_date BETWEEN ? AND ?
            GROUP BY s.course_id, s.academic_year_id, t.tag_name
            ORDER BY s.course_id, s.academic_year_id, t.tag_name
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| TagCount {
                cohort: CohortKey {
                    course_id: row.get("course_id"),
                    academic_year_id: row.get("academic_year_id"),
                },
                tag_name: row.get("tag_name"),
                student_count: row.get::<i64, _>("student_count") as u32,
            })
            .collect())
    }

    async fn earliest_upcoming_assignment(&self, cohort: CohortKey, now: NaiveDateTime) -> Result<Option<Assignment>> {
        let row = sqlx::query(
            r#"
            SELECT a.assignment_id, a.assignment_name, a.assignment_deadline
            FROM assignment a
            JOIN student s ON s.student_id = a.student_id
            WHERE s.course_id = ? AND s.academic_year_id = ? AND a.assignment_deadline >= ?
            ORDER BY a.assignment_deadline
            LIMIT 1
            "#,
        )
        .bind(cohort.course_id)
        .bind(cohort.academic_year_id)
        .bind(now)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| Assignment {
            id: r.get("assignment_id"),
            name: r.get("assignment_name"),
            deadline: r.get("assignment_deadline"),
        }))
    }

    async fn students_inactive_since(&self, since: NaiveDate, include_quick_track: bool) -> Result<Vec<StudentProfile>> {
        let rows = sqlx::query(
            r#"
            SELECT s.student_id, s.name, s.student_number, s.email, s.course_id, s.academic_year_id
            FROM student s
            WHERE NOT EXISTS (
                    SELECT 1 FROM daily_record dr
                    WHERE dr.student_id = s.student_id AND dr.record_date >= ?
                )
              AND (? = 0 OR NOT EXISTS (
                    SELECT 1 FROM quick_track qt
                    WHERE qt.student_id = s.student_id AND date(qt.quick_track_timestamp) >= ?
                ))
            ORDER BY s.student_id
            "#,
        )
        .bind(since)
        .bind(include_quick_track)
        .bind(since)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(Self::student_from_row).collect())
    }

    async fn list_staff(&self) -> Result<Vec<StaffMember>> {
        let rows = sqlx::query("SELECT staff_id, name, email FROM staff ORDER BY staff_id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|r| StaffMember {
                id: r.get("staff_id"),
                name: r.get("name"),
                email: r.get("email"),
            })
            .collect())
    }
}
