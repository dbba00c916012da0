use chrono::{NaiveDate, NaiveDateTime};

use super::metrics::{Metric, MetricSnapshot};

/// Resolved catalogue references of a daily submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecordFields {
    pub mood_id: i64,
    pub exercise_id: i64,
    pub sleep_id: i64,
    pub socialisation_id: i64,
    pub productivity_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub id: i64,
    pub student_id: i64,
    pub record_date: NaiveDate,
    pub recorded_at: NaiveDateTime,
    pub fields: DailyRecordFields,
}

/// Lookup tables that turn a submitted reference id into a numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricReference {
    Mood,
    Exercise,
    Sleep,
    Socialisation,
}

impl MetricReference {
    pub fn table(&self) -> &'static str {
        match self {
            MetricReference::Mood => "moods",
            MetricReference::Exercise => "exercise",
            MetricReference::Sleep => "sleep",
            MetricReference::Socialisation => "socialisation",
        }
    }

    pub fn id_column(&self) -> &'static str {
        match self {
            MetricReference::Mood => "mood_id",
            MetricReference::Exercise => "exercise_id",
            MetricReference::Sleep => "sleep_id",
            MetricReference::Socialisation => "socialisation_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricReference::Mood => "mood",
            MetricReference::Exercise => "exercise",
            MetricReference::Sleep => "sleep",
            MetricReference::Socialisation => "socialisation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// One analytics sample, either a daily record or a quick-track ping.
///
/// Quick-track pings only carry a mood score; every other metric is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub student_id: i64,
    pub course_id: i64,
    pub academic_year_id: i64,
    pub recorded_at: NaiveDateTime,
    pub mood_score: Option<f64>,
    pub exercise_score: Option<f64>,
    pub sleep_score: Option<f64>,
    pub socialisation_score: Option<f64>,
    pub productivity_score: Option<f64>,
}

impl MergedRecord {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Mood => self.mood_score,
            Metric::Exercise => self.exercise_score,
            Metric::Sleep => self.sleep_score,
            Metric::Socialisation => self.socialisation_score,
            Metric::Productivity => self.productivity_score,
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::from_fn(|metric| self.value(metric))
    }
}

/// Filter applied to the merged record query. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordScope {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    pub academic_year_id: Option<i64>,
}

impl RecordScope {
    pub fn student(student_id: i64) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn cohort(course_id: Option<i64>, academic_year_id: Option<i64>) -> Self {
        Self {
            student_id: None,
            course_id,
            academic_year_id,
        }
    }

    pub fn everyone() -> Self {
        Self::default()
    }
}
