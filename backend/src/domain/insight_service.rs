//! # Insight Service
//!
//! Compares a student's current week with the week before and reports
//! directional changes per metric plus correlation based advisories.
//!
//! ## Algorithm
//!
//! 1. Both windows need at least one day of data, otherwise a single
//!    `InsufficientData` insight is returned.
//! 2. Each metric whose window average rose or fell yields `Improved` or
//!    `Declined`; equal or missing averages yield nothing.
//! 3. Pearson correlation is computed over the current week's daily values
//!    for a fixed set of (driver, outcome) pairs. A pair above the correlation
//!    threshold whose two averages are both below the low-value threshold
//!    yields an `Advisory`.

use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AnalyticsConfig;
use crate::domain::errors::DomainResult;
use crate::domain::metrics_service::{group_daily, window_average};
use crate::domain::models::daily_record::RecordScope;
use crate::domain::models::insight::{Correlation, Insight, InsightReport, CORRELATION_PAIRS};
use crate::domain::models::metrics::{DailyMetrics, Metric};
use crate::storage::{Connection, DailyRecordStorage};

/// Pearson correlation of two metrics over the days where both are present.
///
/// Returns 0.0 for fewer than two pairs or when either series is constant.
pub fn pearson_correlation(samples: &[DailyMetrics], a: Metric, b: Metric) -> f64 {
    let pairs: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|d| Some((d.value(a)?, d.value(b)?)))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut covariance, mut variance_a, mut variance_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        variance_a += dx * dx;
        variance_b += dy * dy;
    }

    let denominator = (variance_a * variance_b).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (covariance / denominator).clamp(-1.0, 1.0)
}

pub fn generate_insights(
    current: &[DailyMetrics],
    previous: &[DailyMetrics],
    config: &AnalyticsConfig,
) -> InsightReport {
    if current.is_empty() || previous.is_empty() {
        return InsightReport {
            insights: vec![Insight::InsufficientData],
            correlations: Vec::new(),
        };
    }

    let mut insights = Vec::new();
    for metric in Metric::ALL {
        let (Some(current_average), Some(previous_average)) =
            (window_average(current, metric), window_average(previous, metric))
        else {
            continue;
        };
        if current_average > previous_average {
            insights.push(Insight::Improved { metric, previous_average, current_average });
        } else if current_average < previous_average {
            insights.push(Insight::Declined { metric, previous_average, current_average });
        }
    }

    let correlations: Vec<Correlation> = CORRELATION_PAIRS
        .iter()
        .map(|(driver, outcome)| Correlation {
            metric_a: *driver,
            metric_b: *outcome,
            correlation: pearson_correlation(current, *driver, *outcome),
        })
        .collect();

    for c in &correlations {
        let is_low = |metric| {
            window_average(current, metric)
                .map(|avg| avg < config.low_value_threshold)
                .unwrap_or(false)
        };
        if c.correlation > config.correlation_threshold && is_low(c.metric_a) && is_low(c.metric_b) {
            insights.push(Insight::Advisory {
                driver: c.metric_a,
                outcome: c.metric_b,
                correlation: c.correlation,
            });
        }
    }

    InsightReport { insights, correlations }
}

#[derive(Clone)]
pub struct InsightService<C: Connection> {
    daily_record_repository: C::DailyRecordRepository,
    config: AnalyticsConfig,
}

impl<C: Connection> InsightService<C> {
    pub fn new(connection: Arc<C>, config: AnalyticsConfig) -> Self {
        Self {
            daily_record_repository: connection.create_daily_record_repository(),
            config,
        }
    }

    /// Insights for the week ending `today` against the week before it
    pub async fn insights(&self, student_id: i64, today: NaiveDate) -> DomainResult<InsightReport> {
        info!("Generating insights for student {} on {}", student_id, today);
        let days = self.config.weekly_window_days;
        let current_start = today - Duration::days(days - 1);
        let previous_start = current_start - Duration::days(days);
        let previous_end = current_start - Duration::days(1);

        let scope = RecordScope::student(student_id);
        let current = self
            .daily_record_repository
            .query_records_in_window(&scope, current_start, today)
            .await?;
        let previous = self
            .daily_record_repository
            .query_records_in_window(&scope, previous_start, previous_end)
            .await?;

        let report = generate_insights(&group_daily(&current), &group_daily(&previous), &self.config);
        debug!("Insights for student {}: {:?}", student_id, report.insights);
        Ok(report)
    }
}
