use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;

use super::repositories::{
    CatalogueRepository, CohortRepository, DailyRecordRepository, QuickTrackRepository, StreakRepository,
};
use super::traits::Connection;

// Score catalogues: (table, id column, name column, names for scores 1 to 5)
const SCORE_CATALOGUES: [(&str, &str, &str, [&str; 5]); 4] = [
    ("moods", "mood_id", "mood_name", ["Awful", "Bad", "Okay", "Good", "Great"]),
    ("exercise", "exercise_id", "exercise_name", ["None", "Light", "Moderate", "Active", "Very active"]),
    ("sleep", "sleep_id", "sleep_name", ["Very poor", "Poor", "Fair", "Good", "Excellent"]),
    ("socialisation", "socialisation_id", "socialisation_name", ["Isolated", "Little", "Some", "Plenty", "Very social"]),
];

const TAGS: [&str; 6] = ["stressed", "lonely", "anxious", "tired", "motivated", "overwhelmed"];

/// DbConnection manages the SQLite pool shared by every repository
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the database at `url` and prepare the schema
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating database {}", url);
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;

        Self::setup_schema(&pool).await?;
        Self::seed_catalogues(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Private in-memory database for tests
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        use sqlx::sqlite::SqlitePoolOptions;

        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::setup_schema(&pool).await?;
        Self::seed_catalogues(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        // Create course and academic year tables
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS course (
                course_id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_name TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS academic_year (
                academic_year_id INTEGER PRIMARY KEY AUTOINCREMENT,
                year_label TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Create student table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student (
                student_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                student_number TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                course_id INTEGER NOT NULL,
                academic_year_id INTEGER NOT NULL,
                FOREIGN KEY (course_id) REFERENCES course (course_id),
                FOREIGN KEY (academic_year_id) REFERENCES academic_year (academic_year_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_student_cohort
            ON student(course_id, academic_year_id);
            "#,
        )
        .execute(pool)
        .await?;

        // Create staff table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS staff (
                staff_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Create score catalogue tables
        for (table, id_column, name_column, _) in SCORE_CATALOGUES.iter() {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    {id_column} INTEGER PRIMARY KEY,
                    {name_column} TEXT NOT NULL,
                    score REAL NOT NULL
                );"
            );
            sqlx::query(&ddl).execute(pool).await?;
        }

        // Create tag catalogue
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tag (
                tag_id INTEGER PRIMARY KEY AUTOINCREMENT,
                tag_name TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Create daily_record table, one row per student and day
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_record (
                daily_record_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                record_date TEXT NOT NULL,
                daily_record_timestamp TEXT NOT NULL,
                mood_id INTEGER NOT NULL,
                exercise_id INTEGER NOT NULL,
                sleep_id INTEGER NOT NULL,
                socialisation_id INTEGER NOT NULL,
                productivity_score REAL NOT NULL,
                UNIQUE (student_id, record_date),
                FOREIGN KEY (student_id) REFERENCES student (student_id) ON DELETE CASCADE,
                FOREIGN KEY (mood_id) REFERENCES moods (mood_id),
                FOREIGN KEY (exercise_id) REFERENCES exercise (exercise_id),
                FOREIGN KEY (sleep_id) REFERENCES sleep (sleep_id),
                FOREIGN KEY (socialisation_id) REFERENCES socialisation (socialisation_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_daily_record_date
            ON daily_record(record_date);
            "#,
        )
        .execute(pool)
        .await?;

        // Create daily_record_tag join table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_record_tag (
                daily_record_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (daily_record_id, tag_id),
                FOREIGN KEY (daily_record_id) REFERENCES daily_record (daily_record_id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tag (tag_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Create quick_track table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quick_track (
                quick_track_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                mood_id INTEGER NOT NULL,
                quick_track_timestamp TEXT NOT NULL,
                FOREIGN KEY (student_id) REFERENCES student (student_id) ON DELETE CASCADE,
                FOREIGN KEY (mood_id) REFERENCES moods (mood_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_quick_track_student_time
            ON quick_track(student_id, quick_track_timestamp DESC);
            "#,
        )
        .execute(pool)
        .await?;

        // Create streak table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS streak (
                student_id INTEGER PRIMARY KEY,
                streak_value INTEGER NOT NULL DEFAULT 0,
                last_record_time TEXT,
                FOREIGN KEY (student_id) REFERENCES student (student_id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Create assignment table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assignment (
                assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                assignment_name TEXT NOT NULL,
                assignment_deadline TEXT NOT NULL,
                FOREIGN KEY (student_id) REFERENCES student (student_id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Seed score and tag catalogues; existing rows are left alone
    async fn seed_catalogues(pool: &SqlitePool) -> Result<()> {
        for (table, id_column, name_column, names) in SCORE_CATALOGUES.iter() {
            let insert = format!(
                "INSERT OR IGNORE INTO {table} ({id_column}, {name_column}, score) VALUES (?, ?, ?)"
            );
            for (index, name) in names.iter().enumerate() {
                let score = (index + 1) as i64;
                sqlx::query(&insert)
                    .bind(score)
                    .bind(*name)
                    .bind(score as f64)
                    .execute(pool)
                    .await?;
            }
        }

        for tag in TAGS.iter() {
            sqlx::query("INSERT OR IGNORE INTO tag (tag_name) VALUES (?)")
                .bind(*tag)
                .execute(pool)
                .await?;
        }

        Ok(())
    }
}

impl Connection for DbConnection {
    type DailyRecordRepository = DailyRecordRepository;
    type QuickTrackRepository = QuickTrackRepository;
    type StreakRepository = StreakRepository;
    type CatalogueRepository = CatalogueRepository;
    type CohortRepository = CohortRepository;

    fn create_daily_record_repository(&self) -> Self::DailyRecordRepository {
        DailyRecordRepository::new(self.clone())
    }

    fn create_quick_track_repository(&self) -> Self::QuickTrackRepository {
        QuickTrackRepository::new(self.clone())
    }

    fn create_streak_repository(&self) -> Self::StreakRepository {
        StreakRepository::new(self.clone())
    }

    fn create_catalogue_repository(&self) -> Self::CatalogueRepository {
        CatalogueRepository::new(self.clone())
    }

    fn create_cohort_repository(&self) -> Self::CohortRepository {
        CohortRepository::new(self.clone())
    }
}
