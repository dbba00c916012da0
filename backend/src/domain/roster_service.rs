//! Staff-facing roster and overview counters.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::commands::roster::{RosterEntry, StaffOverview};
use crate::domain::errors::DomainResult;
use crate::domain::metrics_service::{group_daily, mean};
use crate::domain::models::daily_record::{MergedRecord, RecordScope};
use crate::domain::models::metrics::{DailyMetrics, Metric};
use crate::storage::{CohortStorage, Connection, DailyRecordStorage};

const ROSTER_TREND_DAYS: i64 = 7;

/// Latest day's mood minus the average mood of the earlier days.
/// `None` with fewer than two days carrying a mood.
pub fn mood_trend(series: &[DailyMetrics]) -> Option<f64> {
    let moods: Vec<f64> = series.iter().filter_map(|d| d.value(Metric::Mood)).collect();
    let (latest, earlier) = moods.split_last()?;
    let earlier_average = mean(earlier.iter().copied())?;
    Some(latest - earlier_average)
}

#[derive(Clone)]
pub struct RosterService<C: Connection> {
    cohort_repository: C::CohortRepository,
    daily_record_repository: C::DailyRecordRepository,
}

impl<C: Connection> RosterService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            cohort_repository: connection.create_cohort_repository(),
            daily_record_repository: connection.create_daily_record_repository(),
        }
    }

    /// Every student with their last recording time and weekly mood trend
    pub async fn student_roster(&self, today: NaiveDate) -> DomainResult<Vec<RosterEntry>> {
        info!("Building student roster for {}", today);
        let activity = self.cohort_repository.list_student_activity().await?;
        let start = today - Duration::days(ROSTER_TREND_DAYS - 1);
        let records = self
            .daily_record_repository
            .query_records_in_window(&RecordScope::everyone(), start, today)
            .await?;

        let mut by_student: BTreeMap<i64, Vec<MergedRecord>> = BTreeMap::new();
        for record in records {
            by_student.entry(record.student_id).or_default().push(record);
        }

        Ok(activity
            .into_iter()
            .map(|entry| {
                let mood_trend = by_student
                    .get(&entry.student.id)
                    .and_then(|records| mood_trend(&group_daily(records)));
                RosterEntry {
                    last_recording: entry.last_recording(),
                    student: entry.student,
                    mood_trend,
                }
            })
            .collect())
    }

    pub async fn overview(&self, today: NaiveDate) -> DomainResult<StaffOverview> {
        let distribution = self.cohort_repository.cohort_sizes().await?;
        let total_students = distribution.iter().map(|(_, n)| n).sum();
        let students_recorded_today = self.daily_record_repository.count_students_recorded_on(today).await?;

        Ok(StaffOverview {
            total_students,
            students_recorded_today,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{at, date, fields, TestFixture};
    use crate::storage::DbConnection;

    #[tokio::test]
    async fn test_roster_trend_needs_two_mood_days() {
        let fixture = TestFixture::new().await;
        let steady = fixture.student("S1", 1, 1).await;
        let single = fixture.student("S2", 1, 1).await;
        fixture.record_with(steady, date(2024, 3, 8), &fields(2, 3)).await;
        fixture.record_with(steady, date(2024, 3, 9), &fields(4, 3)).await;
        fixture.quick_track(steady, at(2024, 3, 10, 11), 5).await;
        fixture.record_with(single, date(2024, 3, 10), &fields(3, 3)).await;

        let service: RosterService<DbConnection> = RosterService::new(fixture.connection());
        let roster = service.student_roster(date(2024, 3, 10)).await.expect("roster");

        let steady_entry = roster.iter().find(|e| e.student.id == steady).expect("steady");
        assert_eq!(steady_entry.mood_trend, Some(2.0));
        assert_eq!(steady_entry.last_recording, Some(at(2024, 3, 10, 11)));

        let single_entry = roster.iter().find(|e| e.student.id == single).expect("single");
        assert_eq!(single_entry.mood_trend, None);
    }

    #[tokio::test]
    async fn test_overview_counts() {
        let fixture = TestFixture::new().await;
        let a = fixture.student("S1", 1, 1).await;
        fixture.student("S2", 1, 1).await;
        fixture.student("S3", 2, 2).await;
        fixture.record(a, date(2024, 3, 10), 3, 3).await;

        let service: RosterService<DbConnection> = RosterService::new(fixture.connection());
        let overview = service.overview(date(2024, 3, 10)).await.expect("overview");

        assert_eq!(overview.total_students, 3);
        assert_eq!(overview.students_recorded_today, 1);
        assert_eq!(overview.distribution.len(), 2);
    }
}
