use super::metrics::Metric;

/// Structured, wording-free insight derived from comparing two weekly windows.
#[derive(Debug, Clone, PartialEq)]
pub enum Insight {
    InsufficientData,
    Improved {
        metric: Metric,
        previous_average: f64,
        current_average: f64,
    },
    Declined {
        metric: Metric,
        previous_average: f64,
        current_average: f64,
    },
    /// `driver` appears to help `outcome` and both are currently low
    Advisory {
        driver: Metric,
        outcome: Metric,
        correlation: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub metric_a: Metric,
    pub metric_b: Metric,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightReport {
    pub insights: Vec<Insight>,
    pub correlations: Vec<Correlation>,
}

/// Metric pairs checked for advisories, as (driver, outcome).
pub const CORRELATION_PAIRS: [(Metric, Metric); 6] = [
    (Metric::Sleep, Metric::Mood),
    (Metric::Exercise, Metric::Mood),
    (Metric::Socialisation, Metric::Mood),
    (Metric::Mood, Metric::Productivity),
    (Metric::Sleep, Metric::Productivity),
    (Metric::Exercise, Metric::Productivity),
];
