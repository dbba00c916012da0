use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a daily wellness submission.
///
/// Every reference is optional on the wire so that a missing field can be
/// reported as a validation failure rather than a deserialisation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrackRequest {
    pub mood_id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub sleep_id: Option<i64>,
    pub socialisation_id: Option<i64>,
    /// Self-reported productivity on the configured score scale
    pub productivity_score: Option<f64>,
    /// Tag catalogue ids; replaces any tags already attached to today's record
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrackResponse {
    pub daily_record_id: i64,
    pub streak_value: u32,
    /// True when the submission replaced a record already stored for today
    pub updated_existing: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatusResponse {
    pub already_tracked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickTrackRequest {
    pub mood_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickTrackResponse {
    pub quick_track_id: i64,
    pub message: String,
}

/// Returned with `409 Conflict` while the quick-track cooldown is running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownResponse {
    pub message: String,
    pub remaining_time_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakResponse {
    pub streak_value: u32,
}

/// One value per wellness metric; `None` means no data was available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub mood: Option<f64>,
    pub exercise: Option<f64>,
    pub sleep: Option<f64>,
    pub socialisation: Option<f64>,
    pub productivity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTrends {
    pub mood: f64,
    pub exercise: f64,
    pub sleep: f64,
    pub socialisation: f64,
    pub productivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAverage {
    pub date: NaiveDate,
    pub avg_mood: Option<f64>,
    pub avg_exercise: Option<f64>,
    pub avg_sleep: Option<f64>,
    pub avg_socialisation: Option<f64>,
    pub avg_productivity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAveragesRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Cohort filter for the staff wellness trends; missing dates default to the last 30 days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessTrendsRequest {
    pub course: Option<i64>,
    pub academic_year: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAveragesResponse {
    pub days: Vec<DailyAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatsResponse {
    pub today: MetricValues,
    pub averages: MetricValues,
    pub trends: MetricTrends,
}

/// Structured insight fact; the client decides how to phrase it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightFact {
    InsufficientData,
    Improved {
        metric: String,
        previous_average: f64,
        current_average: f64,
    },
    Declined {
        metric: String,
        previous_average: f64,
        current_average: f64,
    },
    Advisory {
        driver: String,
        outcome: String,
        correlation: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub metric_a: String,
    pub metric_b: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: Vec<InsightFact>,
    pub correlations: Vec<CorrelationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSummary {
    pub assignment_id: i64,
    pub assignment_name: String,
    pub assignment_deadline: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcerningCohort {
    pub course_id: i64,
    pub academic_year_id: i64,
    pub avg_mood: Option<f64>,
    pub avg_exercise: Option<f64>,
    pub avg_sleep: Option<f64>,
    pub avg_socialisation: Option<f64>,
    pub avg_productivity: Option<f64>,
    pub student_count: u32,
    pub frequent_tags: Vec<String>,
    pub earliest_assignment: Option<AssignmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcerningCohortsResponse {
    pub is_concerning: bool,
    pub concerning_cohorts: Vec<ConcerningCohort>,
}

/// Query string of the staff aggregated-data endpoint, e.g.
/// `?metrics=mood,sleep&course=2&academic_year=1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDataRequest {
    pub metrics: String,
    pub course: Option<i64>,
    pub academic_year: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSample {
    pub recorded_at: NaiveDateTime,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDataResponse {
    pub data: Vec<AggregatedSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub student_id: i64,
    pub student_name: String,
    pub student_number: String,
    pub last_recording_date: Option<NaiveDateTime>,
    /// `None` when the student has fewer than two mood samples this week
    pub mood_trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRosterResponse {
    pub students: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortDistribution {
    pub course_id: i64,
    pub academic_year_id: i64,
    pub student_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffOverviewResponse {
    pub total_students: u32,
    pub students_recorded_today: u32,
    pub distribution: Vec<CohortDistribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortMoodRequest {
    pub course: Option<i64>,
    pub academic_year: Option<i64>,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortMoodComparisonResponse {
    pub current_year_mood: Option<f64>,
    pub previous_year_mood: Option<f64>,
    pub trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
