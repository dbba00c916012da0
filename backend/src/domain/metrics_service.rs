//! # Metrics Service
//!
//! Per-day and window averages of the five wellness metrics, merging daily
//! records with quick-track pings.
//!
//! ## Business Rules
//!
//! - Quick-track pings only contribute to mood.
//! - Missing values are skipped, never counted as zero.
//! - An empty window yields `None` ("no data"), and a trend against "no data"
//!   is `0.0`.
//! - Window averages weigh every day equally: they average the per-day
//!   averages, not the raw samples.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::AnalyticsConfig;
use crate::domain::commands::analytics::{AggregatedDataQuery, CohortMoodQuery, CohortTrendsQuery};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::daily_record::{MergedRecord, RecordScope};
use crate::domain::models::metrics::{
    AggregatedSample, CohortMoodComparison, DailyMetrics, DashboardStats, Metric, MetricSnapshot, MetricTrends,
};
use crate::storage::{Connection, DailyRecordStorage};

/// Mean of the non-null values, or `None` when there are none
pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Per-metric average over a set of samples
pub fn average_samples<'a>(records: impl Iterator<Item = &'a MergedRecord> + Clone) -> MetricSnapshot {
    MetricSnapshot::from_fn(|metric| mean(records.clone().filter_map(|r| r.value(metric))))
}

/// Group samples by calendar date, ordered by date
pub fn group_daily(records: &[MergedRecord]) -> Vec<DailyMetrics> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&MergedRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.recorded_at.date()).or_default().push(record);
    }

    by_date
        .into_iter()
        .map(|(date, day)| DailyMetrics {
            date,
            values: average_samples(day.iter().copied()),
        })
        .collect()
}

pub fn window_average(series: &[DailyMetrics], metric: Metric) -> Option<f64> {
    mean(series.iter().filter_map(|d| d.value(metric)))
}

pub fn window_averages(series: &[DailyMetrics]) -> MetricSnapshot {
    MetricSnapshot::from_fn(|metric| window_average(series, metric))
}

/// `today - average`, or 0 when either side has no data
pub fn trend(today: Option<f64>, average: Option<f64>) -> f64 {
    match (today, average) {
        (Some(t), Some(a)) => t - a,
        _ => 0.0,
    }
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - Duration::days(1)))
}

#[derive(Clone)]
pub struct MetricsService<C: Connection> {
    daily_record_repository: C::DailyRecordRepository,
    config: AnalyticsConfig,
}

impl<C: Connection> MetricsService<C> {
    pub fn new(connection: Arc<C>, config: AnalyticsConfig) -> Self {
        Self {
            daily_record_repository: connection.create_daily_record_repository(),
            config,
        }
    }

    /// Merged samples of a scope, grouped per day
    pub async fn daily_series(
        &self,
        scope: &RecordScope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<DailyMetrics>> {
        let records = self
            .daily_record_repository
            .query_records_in_window(scope, start, end)
            .await?;
        Ok(group_daily(&records))
    }

    pub async fn daily_averages(
        &self,
        student_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<DailyMetrics>> {
        info!("Daily averages for student {} from {} to {}", student_id, start, end);
        if start > end {
            return Err(DomainError::Validation(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }
        self.daily_series(&RecordScope::student(student_id), start, end).await
    }

    /// Per-day averages over every student matching a cohort filter
    pub async fn cohort_daily_averages(&self, query: CohortTrendsQuery) -> DomainResult<Vec<DailyMetrics>> {
        info!("Cohort daily averages: {:?}", query);
        if query.start > query.end {
            return Err(DomainError::Validation(format!(
                "start_date {} is after end_date {}",
                query.start, query.end
            )));
        }
        let scope = RecordScope::cohort(query.course_id, query.academic_year_id);
        self.daily_series(&scope, query.start, query.end).await
    }

    /// Today's values against the average of the preceding week
    pub async fn dashboard(&self, student_id: i64, today: NaiveDate) -> DomainResult<DashboardStats> {
        info!("Dashboard stats for student {} on {}", student_id, today);
        let start = today - Duration::days(self.config.weekly_window_days);
        let series = self
            .daily_series(&RecordScope::student(student_id), start, today)
            .await?;

        let (today_series, earlier): (Vec<_>, Vec<_>) = series.into_iter().partition(|d| d.date == today);
        let today_values = today_series.first().map(|d| d.values).unwrap_or_default();
        let averages = window_averages(&earlier);
        let trends = MetricTrends::from_fn(|metric| trend(today_values.get(metric), averages.get(metric)));

        Ok(DashboardStats {
            today: today_values,
            averages,
            trends,
        })
    }

    /// Per-sample projection of the requested metrics for a cohort filter
    pub async fn aggregated_data(&self, query: AggregatedDataQuery) -> DomainResult<Vec<AggregatedSample>> {
        info!("Aggregated data query: {:?}", query);
        if query.metrics.is_empty() {
            return Err(DomainError::Validation("At least one metric is required".to_string()));
        }
        if query.start > query.end {
            return Err(DomainError::Validation(format!(
                "start_date {} is after end_date {}",
                query.start, query.end
            )));
        }

        let scope = RecordScope::cohort(query.course_id, query.academic_year_id);
        let records = self
            .daily_record_repository
            .query_records_in_window(&scope, query.start, query.end)
            .await?;

        Ok(records
            .iter()
            .map(|record| AggregatedSample {
                recorded_at: record.recorded_at,
                values: query.metrics.iter().map(|m| (*m, record.value(*m))).collect(),
            })
            .collect())
    }

    /// Average mood of a calendar month compared with the same month a year earlier
    pub async fn cohort_mood_year_over_year(&self, query: CohortMoodQuery) -> DomainResult<CohortMoodComparison> {
        info!("Cohort mood comparison: {:?}", query);
        let scope = RecordScope::cohort(query.course_id, query.academic_year_id);

        let (start, end) = month_bounds(query.year, query.month)
            .ok_or_else(|| DomainError::Validation(format!("Invalid month {}-{}", query.year, query.month)))?;
        let (prev_start, prev_end) = month_bounds(query.year - 1, query.month)
            .ok_or_else(|| DomainError::Validation(format!("Invalid month {}-{}", query.year - 1, query.month)))?;

        let current = self.daily_series(&scope, start, end).await?;
        let previous = self.daily_series(&scope, prev_start, prev_end).await?;

        let current_year_mood = window_average(&current, Metric::Mood);
        let previous_year_mood = window_average(&previous, Metric::Mood);

        Ok(CohortMoodComparison {
            current_year_mood,
            previous_year_mood,
            trend: trend(current_year_mood, previous_year_mood),
        })
    }
}

/// Default aggregated-data window: the 30 days up to `today`
pub fn default_aggregation_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(30), today)
}
