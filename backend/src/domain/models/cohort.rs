use chrono::NaiveDateTime;

use super::metrics::MetricSnapshot;

/// A cohort is every student sharing a (course, academic year) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CohortKey {
    pub course_id: i64,
    pub academic_year_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentProfile {
    pub id: i64,
    pub name: String,
    pub student_number: String,
    pub email: String,
    pub cohort: CohortKey,
}

/// Latest engagement timestamps of one student, kept per source.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentActivity {
    pub student: StudentProfile,
    pub last_daily_record: Option<NaiveDateTime>,
    pub last_quick_track: Option<NaiveDateTime>,
}

impl StudentActivity {
    pub fn last_recording(&self) -> Option<NaiveDateTime> {
        match (self.last_daily_record, self.last_quick_track) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffMember {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Number of distinct students in a cohort who carried a tag in a window.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCount {
    pub cohort: CohortKey,
    pub tag_name: String,
    pub student_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub deadline: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcerningCohort {
    pub cohort: CohortKey,
    /// Window averages; all `None` when only the tag source flagged the cohort
    pub averages: MetricSnapshot,
    pub student_count: u32,
    pub frequent_tags: Vec<String>,
    pub earliest_assignment: Option<Assignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortRiskReport {
    pub is_concerning: bool,
    pub concerning_cohorts: Vec<ConcerningCohort>,
    /// Cohorts whose assignment lookup failed; they are still reported
    pub enrichment_failures: Vec<CohortKey>,
}
