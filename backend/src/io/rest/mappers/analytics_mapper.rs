use shared::{
    CohortMoodComparisonResponse, CorrelationEntry, DailyAverage, DashboardStatsResponse, InsightFact,
    InsightsResponse, MetricTrends as MetricTrendsDto, MetricValues,
};

use crate::domain::models::insight::{Insight, InsightReport};
use crate::domain::models::metrics::{CohortMoodComparison, DailyMetrics, DashboardStats, MetricSnapshot, MetricTrends};

pub struct AnalyticsMapper;

impl AnalyticsMapper {
    pub fn to_metric_values(snapshot: MetricSnapshot) -> MetricValues {
        MetricValues {
            mood: snapshot.mood,
            exercise: snapshot.exercise,
            sleep: snapshot.sleep,
            socialisation: snapshot.socialisation,
            productivity: snapshot.productivity,
        }
    }

    fn to_trends(trends: MetricTrends) -> MetricTrendsDto {
        MetricTrendsDto {
            mood: trends.mood,
            exercise: trends.exercise,
            sleep: trends.sleep,
            socialisation: trends.socialisation,
            productivity: trends.productivity,
        }
    }

    pub fn to_dashboard_response(stats: DashboardStats) -> DashboardStatsResponse {
        DashboardStatsResponse {
            today: Self::to_metric_values(stats.today),
            averages: Self::to_metric_values(stats.averages),
            trends: Self::to_trends(stats.trends),
        }
    }

    pub fn to_daily_averages(series: Vec<DailyMetrics>) -> Vec<DailyAverage> {
        series
            .into_iter()
            .map(|day| DailyAverage {
                date: day.date,
                avg_mood: day.values.mood,
                avg_exercise: day.values.exercise,
                avg_sleep: day.values.sleep,
                avg_socialisation: day.values.socialisation,
                avg_productivity: day.values.productivity,
            })
            .collect()
    }

    pub fn to_insight_fact(insight: Insight) -> InsightFact {
        match insight {
            Insight::InsufficientData => InsightFact::InsufficientData,
            Insight::Improved { metric, previous_average, current_average } => InsightFact::Improved {
                metric: metric.to_string(),
                previous_average,
                current_average,
            },
            Insight::Declined { metric, previous_average, current_average } => InsightFact::Declined {
                metric: metric.to_string(),
                previous_average,
                current_average,
            },
            Insight::Advisory { driver, outcome, correlation } => InsightFact::Advisory {
                driver: driver.to_string(),
                outcome: outcome.to_string(),
                correlation,
            },
        }
    }

    pub fn to_insights_response(report: InsightReport) -> InsightsResponse {
        InsightsResponse {
            insights: report.insights.into_iter().map(Self::to_insight_fact).collect(),
            correlations: report
                .correlations
                .into_iter()
                .map(|c| CorrelationEntry {
                    metric_a: c.metric_a.to_string(),
                    metric_b: c.metric_b.to_string(),
                    correlation: c.correlation,
                })
                .collect(),
        }
    }

    pub fn to_cohort_mood_response(comparison: CohortMoodComparison) -> CohortMoodComparisonResponse {
        CohortMoodComparisonResponse {
            current_year_mood: comparison.current_year_mood,
            previous_year_mood: comparison.previous_year_mood,
            trend: comparison.trend,
        }
    }
}
