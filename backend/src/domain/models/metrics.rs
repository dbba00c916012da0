use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// The five wellness metrics tracked per student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Mood,
    Exercise,
    Sleep,
    Socialisation,
    Productivity,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Mood,
        Metric::Exercise,
        Metric::Sleep,
        Metric::Socialisation,
        Metric::Productivity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mood => "mood",
            Metric::Exercise => "exercise",
            Metric::Sleep => "sleep",
            Metric::Socialisation => "socialisation",
            Metric::Productivity => "productivity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mood" => Ok(Metric::Mood),
            "exercise" => Ok(Metric::Exercise),
            "sleep" => Ok(Metric::Sleep),
            "socialisation" | "socialization" => Ok(Metric::Socialisation),
            "productivity" => Ok(Metric::Productivity),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

/// One optional value per metric. `None` is the "no data" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSnapshot {
    pub mood: Option<f64>,
    pub exercise: Option<f64>,
    pub sleep: Option<f64>,
    pub socialisation: Option<f64>,
    pub productivity: Option<f64>,
}

impl MetricSnapshot {
    pub fn from_fn(mut f: impl FnMut(Metric) -> Option<f64>) -> Self {
        Self {
            mood: f(Metric::Mood),
            exercise: f(Metric::Exercise),
            sleep: f(Metric::Sleep),
            socialisation: f(Metric::Socialisation),
            productivity: f(Metric::Productivity),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Mood => self.mood,
            Metric::Exercise => self.exercise,
            Metric::Sleep => self.sleep,
            Metric::Socialisation => self.socialisation,
            Metric::Productivity => self.productivity,
        }
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Per-day averages of the merged samples of that day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub values: MetricSnapshot,
}

impl DailyMetrics {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(metric)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricTrends {
    pub mood: f64,
    pub exercise: f64,
    pub sleep: f64,
    pub socialisation: f64,
    pub productivity: f64,
}

impl MetricTrends {
    pub fn from_fn(mut f: impl FnMut(Metric) -> f64) -> Self {
        Self {
            mood: f(Metric::Mood),
            exercise: f(Metric::Exercise),
            sleep: f(Metric::Sleep),
            socialisation: f(Metric::Socialisation),
            productivity: f(Metric::Productivity),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub today: MetricSnapshot,
    pub averages: MetricSnapshot,
    pub trends: MetricTrends,
}

/// One projected row of the staff aggregated-data query.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSample {
    pub recorded_at: NaiveDateTime,
    pub values: Vec<(Metric, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortMoodComparison {
    pub current_year_mood: Option<f64>,
    pub previous_year_mood: Option<f64>,
    pub trend: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parsing_accepts_known_names() {
        assert_eq!("Mood".parse::<Metric>(), Ok(Metric::Mood));
        assert_eq!(" sleep ".parse::<Metric>(), Ok(Metric::Sleep));
        assert_eq!("socialization".parse::<Metric>(), Ok(Metric::Socialisation));
    }

    #[test]
    fn test_metric_parsing_rejects_column_injection() {
        let err = "mood; DROP TABLE student".parse::<Metric>().unwrap_err();
        assert!(err.to_string().contains("Unknown metric"));
    }

    #[test]
    fn test_snapshot_is_empty() {
        assert!(MetricSnapshot::default().is_empty());
        let snapshot = MetricSnapshot {
            sleep: Some(2.0),
            ..MetricSnapshot::default()
        };
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.get(Metric::Sleep), Some(2.0));
    }
}
