//! Domain-level command and query types.
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the DTOs of the `shared`
//! crate to these internal types.

pub mod tracking {
    use chrono::NaiveDateTime;

    /// Input for a daily wellness submission. References are optional so
    /// that a missing one is reported as a validation failure.
    #[derive(Debug, Clone)]
    pub struct SubmitDailyRecordCommand {
        pub student_id: i64,
        pub mood_id: Option<i64>,
        pub exercise_id: Option<i64>,
        pub sleep_id: Option<i64>,
        pub socialisation_id: Option<i64>,
        pub productivity_score: Option<f64>,
        pub tag_ids: Vec<i64>,
        pub now: NaiveDateTime,
    }

    /// Result of a daily submission.
    #[derive(Debug, Clone, PartialEq)]
    pub struct DailyRecordResult {
        pub daily_record_id: i64,
        pub streak_value: u32,
        pub updated_existing: bool,
        pub success_message: String,
    }

    #[derive(Debug, Clone)]
    pub struct QuickTrackCommand {
        pub student_id: i64,
        pub mood_id: Option<i64>,
        pub now: NaiveDateTime,
    }

    /// A ping inside the cooldown window is a typed outcome, not an error.
    #[derive(Debug, Clone, PartialEq)]
    pub enum QuickTrackOutcome {
        Recorded { quick_track_id: i64 },
        CooldownActive { remaining_time_seconds: i64 },
    }
}

pub mod analytics {
    use chrono::NaiveDate;

    use crate::domain::models::metrics::Metric;

    /// Typed filter for the staff aggregated-data query.
    #[derive(Debug, Clone, PartialEq)]
    pub struct AggregatedDataQuery {
        pub metrics: Vec<Metric>,
        pub course_id: Option<i64>,
        pub academic_year_id: Option<i64>,
        pub start: NaiveDate,
        pub end: NaiveDate,
    }

    /// Per-day cohort averages over a date window.
    #[derive(Debug, Clone, PartialEq)]
    pub struct CohortTrendsQuery {
        pub course_id: Option<i64>,
        pub academic_year_id: Option<i64>,
        pub start: NaiveDate,
        pub end: NaiveDate,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct CohortMoodQuery {
        pub course_id: Option<i64>,
        pub academic_year_id: Option<i64>,
        pub year: i32,
        pub month: u32,
    }
}

pub mod roster {
    use chrono::NaiveDateTime;

    use crate::domain::models::cohort::{CohortKey, StudentProfile};

    #[derive(Debug, Clone, PartialEq)]
    pub struct RosterEntry {
        pub student: StudentProfile,
        pub last_recording: Option<NaiveDateTime>,
        pub mood_trend: Option<f64>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct StaffOverview {
        pub total_students: u32,
        pub students_recorded_today: u32,
        pub distribution: Vec<(CohortKey, u32)>,
    }
}
