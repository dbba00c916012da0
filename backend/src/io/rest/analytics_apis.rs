//! # REST API for Student Analytics
//!
//! Dashboard stats, daily averages and insights of one student. Students
//! may read their own analytics; staff may read anyone's.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Local;
use shared::{DailyAveragesRequest, DailyAveragesResponse};
use tracing::info;

use crate::domain::models::principal::Principal;
use crate::io::rest::domain_error_response;
use crate::io::rest::mappers::analytics_mapper::AnalyticsMapper;
use crate::AppState;

/// Create a router for per-student analytics APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats/:student_id", get(get_dashboard_stats))
        .route("/daily-averages/:student_id", get(get_daily_averages))
        .route("/insights/:student_id", get(get_insights))
}

/// Today's values, weekly averages and trends
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    principal: Principal,
    Path(student_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/stats/{}", student_id);

    if let Err(e) = principal.authorize_student_access(student_id) {
        return domain_error_response("reading dashboard stats", e);
    }

    match state.metrics_service.dashboard(student_id, Local::now().date_naive()).await {
        Ok(stats) => (StatusCode::OK, Json(AnalyticsMapper::to_dashboard_response(stats))).into_response(),
        Err(e) => domain_error_response("reading dashboard stats", e),
    }
}

/// Per-day averages between two dates, days without data omitted
pub async fn get_daily_averages(
    State(state): State<AppState>,
    principal: Principal,
    Path(student_id): Path<i64>,
    Query(request): Query<DailyAveragesRequest>,
) -> impl IntoResponse {
    info!("GET /api/daily-averages/{} - request: {:?}", student_id, request);

    if let Err(e) = principal.authorize_student_access(student_id) {
        return domain_error_response("reading daily averages", e);
    }

    match state
        .metrics_service
        .daily_averages(student_id, request.start_date, request.end_date)
        .await
    {
        Ok(series) => (
            StatusCode::OK,
            Json(DailyAveragesResponse {
                days: AnalyticsMapper::to_daily_averages(series),
            }),
        )
            .into_response(),
        Err(e) => domain_error_response("reading daily averages", e),
    }
}

/// Week over week insights and correlations
pub async fn get_insights(
    State(state): State<AppState>,
    principal: Principal,
    Path(student_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/insights/{}", student_id);

    if let Err(e) = principal.authorize_student_access(student_id) {
        return domain_error_response("generating insights", e);
    }

    match state.insight_service.insights(student_id, Local::now().date_naive()).await {
        Ok(report) => (StatusCode::OK, Json(AnalyticsMapper::to_insights_response(report))).into_response(),
        Err(e) => domain_error_response("generating insights", e),
    }
}
