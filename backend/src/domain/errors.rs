use super::models::metrics::UnknownMetric;

/// Failures surfaced by domain services.
///
/// Business conditions such as an active cooldown or an empty window are
/// not errors; they are returned as typed results.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<UnknownMetric> for DomainError {
    fn from(err: UnknownMetric) -> Self {
        DomainError::Validation(err.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
