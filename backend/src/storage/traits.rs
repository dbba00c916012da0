//! # Storage Traits
//!
//! Record store abstraction consumed by the domain services. Every call is
//! an async suspension point and is consistent on its own; no trait method
//! spans more than one logical write unless documented.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::models::{
    cohort::{Assignment, CohortKey, StaffMember, StudentActivity, StudentProfile, TagCount},
    daily_record::{DailyRecord, DailyRecordFields, MergedRecord, MetricReference, RecordScope, Tag},
    streak::Streak,
};

/// Daily record persistence
#[async_trait]
pub trait DailyRecordStorage: Send + Sync {
    /// Find the record of a student for one calendar day
    async fn find_daily_record(&self, student_id: i64, date: NaiveDate) -> Result<Option<DailyRecord>>;

    /// Most recent record date strictly before `date`
    async fn find_latest_record_date_before(&self, student_id: i64, date: NaiveDate) -> Result<Option<NaiveDate>>;

    /// Insert the record for (student, date), or update it in place if one exists.
    /// Returns the record id.
    async fn upsert_daily_record(
        &self,
        student_id: i64,
        date: NaiveDate,
        fields: &DailyRecordFields,
        recorded_at: NaiveDateTime,
    ) -> Result<i64>;

    /// Replace all tag associations of a record with the given set, atomically
    async fn set_tags(&self, daily_record_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Daily records and quick-track pings recorded between `start` and `end`
    /// (inclusive calendar dates), ordered by timestamp
    async fn query_records_in_window(
        &self,
        scope: &RecordScope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MergedRecord>>;

    /// Number of distinct students with a daily record on `date`
    async fn count_students_recorded_on(&self, date: NaiveDate) -> Result<u32>;
}

/// Quick-track ping persistence
#[async_trait]
pub trait QuickTrackStorage: Send + Sync {
    /// Timestamp of the student's most recent ping
    async fn latest_quick_track_time(&self, student_id: i64) -> Result<Option<NaiveDateTime>>;

    /// Store a ping and return its id
    async fn insert_quick_track(&self, student_id: i64, mood_id: i64, recorded_at: NaiveDateTime) -> Result<i64>;
}

/// Streak persistence
#[async_trait]
pub trait StreakStorage: Send + Sync {
    async fn find_streak(&self, student_id: i64) -> Result<Option<Streak>>;

    /// Unconditionally write the streak row
    async fn upsert_streak(&self, student_id: i64, value: u32, last_record_time: Option<NaiveDateTime>) -> Result<()>;

    /// Write the streak only if the stored row still equals `expected`
    /// (`None` meaning no row exists yet). Returns false when another
    /// writer got there first.
    async fn compare_and_swap_streak(
        &self,
        student_id: i64,
        expected: Option<&Streak>,
        value: u32,
        last_record_time: Option<NaiveDateTime>,
    ) -> Result<bool>;
}

/// Score and tag catalogues
#[async_trait]
pub trait CatalogueStorage: Send + Sync {
    /// Numeric score behind a catalogue id, or `None` when the id is unknown
    async fn resolve_score(&self, reference: MetricReference, id: i64) -> Result<Option<f64>>;

    /// Tags matching the given ids; unknown ids are simply absent
    async fn find_tags(&self, tag_ids: &[i64]) -> Result<Vec<Tag>>;
}

/// Student, staff and cohort level views
#[async_trait]
pub trait CohortStorage: Send + Sync {
    async fn list_students(&self) -> Result<Vec<StudentProfile>>;

    async fn find_student(&self, student_id: i64) -> Result<Option<StudentProfile>>;

    /// Every student with their latest daily record and quick-track times
    async fn list_student_activity(&self) -> Result<Vec<StudentActivity>>;

    /// Enrolled student count per cohort
    async fn cohort_sizes(&self) -> Result<Vec<(CohortKey, u32)>>;

    /// Distinct students per (cohort, tag) over daily records in the window
    async fn tag_counts_by_cohort(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TagCount>>;

    /// Earliest assignment of the cohort due at or after `now`
    async fn earliest_upcoming_assignment(&self, cohort: CohortKey, now: NaiveDateTime) -> Result<Option<Assignment>>;

    /// Students without a daily record dated on or after `since`. With
    /// `include_quick_track`, a ping on or after `since` also counts as activity.
    async fn students_inactive_since(&self, since: NaiveDate, include_quick_track: bool) -> Result<Vec<StudentProfile>>;

    async fn list_staff(&self) -> Result<Vec<StaffMember>>;
}

/// Factory for the repositories of one storage backend
pub trait Connection: Send + Sync + Clone + 'static {
    type DailyRecordRepository: DailyRecordStorage + Clone;
    type QuickTrackRepository: QuickTrackStorage + Clone;
    type StreakRepository: StreakStorage + Clone;
    type CatalogueRepository: CatalogueStorage + Clone;
    type CohortRepository: CohortStorage + Clone;

    fn create_daily_record_repository(&self) -> Self::DailyRecordRepository;

    fn create_quick_track_repository(&self) -> Self::QuickTrackRepository;

    fn create_streak_repository(&self) -> Self::StreakRepository;

    fn create_catalogue_repository(&self) -> Self::CatalogueRepository;

    fn create_cohort_repository(&self) -> Self::CohortRepository;
}
