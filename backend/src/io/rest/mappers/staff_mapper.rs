use chrono::NaiveDate;
use shared::{
    AggregatedDataRequest, AggregatedSample as AggregatedSampleDto, AssignmentSummary, CohortDistribution,
    CohortMoodRequest, ConcerningCohort as ConcerningCohortDto, ConcerningCohortsResponse,
    RosterEntry as RosterEntryDto, StaffOverviewResponse, WellnessTrendsRequest,
};

use crate::domain::commands::analytics::{AggregatedDataQuery, CohortMoodQuery, CohortTrendsQuery};
use crate::domain::commands::roster::{RosterEntry, StaffOverview};
use crate::domain::errors::DomainResult;
use crate::domain::metrics_service::default_aggregation_window;
use crate::domain::models::cohort::{CohortRiskReport, ConcerningCohort};
use crate::domain::models::metrics::{AggregatedSample, Metric};

pub struct StaffMapper;

impl StaffMapper {
    /// Parse the comma separated metric list and fill missing dates from the default window
    pub fn to_aggregated_query(request: AggregatedDataRequest, today: NaiveDate) -> DomainResult<AggregatedDataQuery> {
        let mut metrics: Vec<Metric> = Vec::new();
        for name in request.metrics.split(',').filter(|n| !n.trim().is_empty()) {
            let metric = name.parse::<Metric>()?;
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }

        let (default_start, default_end) = default_aggregation_window(today);
        Ok(AggregatedDataQuery {
            metrics,
            course_id: request.course,
            academic_year_id: request.academic_year,
            start: request.start_date.unwrap_or(default_start),
            end: request.end_date.unwrap_or(default_end),
        })
    }

    pub fn to_cohort_trends_query(request: WellnessTrendsRequest, today: NaiveDate) -> CohortTrendsQuery {
        let (default_start, default_end) = default_aggregation_window(today);
        CohortTrendsQuery {
            course_id: request.course,
            academic_year_id: request.academic_year,
            start: request.start_date.unwrap_or(default_start),
            end: request.end_date.unwrap_or(default_end),
        }
    }

    pub fn to_cohort_mood_query(request: CohortMoodRequest) -> CohortMoodQuery {
        CohortMoodQuery {
            course_id: request.course,
            academic_year_id: request.academic_year,
            year: request.year,
            month: request.month,
        }
    }

    fn to_concerning_cohort(cohort: ConcerningCohort) -> ConcerningCohortDto {
        ConcerningCohortDto {
            course_id: cohort.cohort.course_id,
            academic_year_id: cohort.cohort.academic_year_id,
            avg_mood: cohort.averages.mood,
            avg_exercise: cohort.averages.exercise,
            avg_sleep: cohort.averages.sleep,
            avg_socialisation: cohort.averages.socialisation,
            avg_productivity: cohort.averages.productivity,
            student_count: cohort.student_count,
            frequent_tags: cohort.frequent_tags,
            earliest_assignment: cohort.earliest_assignment.map(|a| AssignmentSummary {
                assignment_id: a.id,
                assignment_name: a.name,
                assignment_deadline: a.deadline,
            }),
        }
    }

    pub fn to_concerning_cohorts_response(report: CohortRiskReport) -> ConcerningCohortsResponse {
        ConcerningCohortsResponse {
            is_concerning: report.is_concerning,
            concerning_cohorts: report
                .concerning_cohorts
                .into_iter()
                .map(Self::to_concerning_cohort)
                .collect(),
        }
    }

    pub fn to_aggregated_samples(samples: Vec<AggregatedSample>) -> Vec<AggregatedSampleDto> {
        samples
            .into_iter()
            .map(|sample| AggregatedSampleDto {
                recorded_at: sample.recorded_at,
                values: sample
                    .values
                    .into_iter()
                    .map(|(metric, value)| (metric.to_string(), value))
                    .collect(),
            })
            .collect()
    }

    pub fn to_roster(entries: Vec<RosterEntry>) -> Vec<RosterEntryDto> {
        entries
            .into_iter()
            .map(|entry| RosterEntryDto {
                student_id: entry.student.id,
                student_name: entry.student.name,
                student_number: entry.student.student_number,
                last_recording_date: entry.last_recording,
                mood_trend: entry.mood_trend,
            })
            .collect()
    }

    pub fn to_overview_response(overview: StaffOverview) -> StaffOverviewResponse {
        StaffOverviewResponse {
            total_students: overview.total_students,
            students_recorded_today: overview.students_recorded_today,
            distribution: overview
                .distribution
                .into_iter()
                .map(|(cohort, student_count)| CohortDistribution {
                    course_id: cohort.course_id,
                    academic_year_id: cohort.academic_year_id,
                    student_count,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::storage::test_utils::date;

    fn request(metrics: &str) -> AggregatedDataRequest {
        AggregatedDataRequest {
            metrics: metrics.to_string(),
            course: Some(2),
            academic_year: None,
            start_date: None,
            end_date: Some(date(2024, 3, 5)),
        }
    }

    #[test]
    fn test_aggregated_query_parses_and_dedupes_metrics() {
        let query = StaffMapper::to_aggregated_query(request("mood, Sleep,mood,"), date(2024, 3, 10)).expect("query");
        assert_eq!(query.metrics, vec![Metric::Mood, Metric::Sleep]);
        assert_eq!(query.start, date(2024, 2, 9));
        assert_eq!(query.end, date(2024, 3, 5));
        assert_eq!(query.course_id, Some(2));
    }

    #[test]
    fn test_unknown_metric_is_a_validation_error() {
        let result = StaffMapper::to_aggregated_query(request("mood,happiness"), date(2024, 3, 10));
        assert!(matches!(result, Err(DomainError::Validation(msg)) if msg.contains("happiness")));
    }
}
