//! # REST API Interface Layer
//!
//! HTTP endpoints of the wellness tracker. Handlers resolve the caller's
//! [`Principal`](crate::domain::models::principal::Principal), map request
//! DTOs to domain commands, and translate results back.
//!
//! ## Error Mapping
//!
//! | Domain outcome          | Status |
//! |-------------------------|--------|
//! | `Validation`            | 400    |
//! | missing principal       | 401    |
//! | `Forbidden`             | 403    |
//! | `NotFound`              | 404    |
//! | quick-track cooldown    | 409    |
//! | `Storage`               | 500    |

pub mod analytics_apis;
pub mod mappers;
pub mod principal;
pub mod staff_apis;
pub mod tracking_apis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;
use tracing::{error, warn};

use crate::domain::errors::DomainError;

/// Translate a domain failure into an HTTP response, logging it on the way
pub fn domain_error_response(context: &str, e: DomainError) -> Response {
    let (status, message) = match &e {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, e.to_string()),
        DomainError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error {}", context)),
    };

    if status.is_server_error() {
        error!("Failed {}: {:#}", context, e);
    } else {
        warn!("Rejected {}: {}", context, e);
    }
    (status, Json(ErrorResponse { message })).into_response()
}

/// Configuration for handler tests that authenticate through gateway headers
#[cfg(test)]
pub(crate) fn gateway_config() -> crate::config::AppConfig {
    crate::config::AppConfig {
        trust_principal_headers: true,
        ..crate::config::AppConfig::default()
    }
}
