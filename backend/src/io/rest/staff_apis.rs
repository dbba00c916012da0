//! # REST API for Staff Views
//!
//! Cohort level analytics. Every endpoint requires the `ViewCohorts`
//! capability.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Local;
use shared::{
    AggregatedDataRequest, AggregatedDataResponse, CohortMoodRequest, DailyAveragesResponse, StudentRosterResponse,
    WellnessTrendsRequest,
};
use tracing::info;

use crate::domain::models::principal::{Capability, Principal};
use crate::io::rest::domain_error_response;
use crate::io::rest::mappers::analytics_mapper::AnalyticsMapper;
use crate::io::rest::mappers::staff_mapper::StaffMapper;
use crate::AppState;

/// Create a router for staff APIs, nested under `/staff`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/concerning-cohorts", get(get_concerning_cohorts))
        .route("/aggregated-data", get(get_aggregated_data))
        .route("/students", get(get_student_roster))
        .route("/overview", get(get_overview))
        .route("/cohort-mood", get(get_cohort_mood))
        .route("/wellness-trends", get(get_wellness_trends))
}

/// Cohorts whose wellness averages or tag frequencies breach a threshold
pub async fn get_concerning_cohorts(State(state): State<AppState>, principal: Principal) -> impl IntoResponse {
    info!("GET /api/staff/concerning-cohorts");

    if let Err(e) = principal.require(Capability::ViewCohorts) {
        return domain_error_response("detecting concerning cohorts", e);
    }

    match state.cohort_risk_service.detect(Local::now().naive_local()).await {
        Ok(report) => (StatusCode::OK, Json(StaffMapper::to_concerning_cohorts_response(report))).into_response(),
        Err(e) => domain_error_response("detecting concerning cohorts", e),
    }
}

/// Per-sample metric values for a cohort filter
pub async fn get_aggregated_data(
    State(state): State<AppState>,
    principal: Principal,
    Query(request): Query<AggregatedDataRequest>,
) -> impl IntoResponse {
    info!("GET /api/staff/aggregated-data - request: {:?}", request);

    if let Err(e) = principal.require(Capability::ViewCohorts) {
        return domain_error_response("reading aggregated data", e);
    }

    let query = match StaffMapper::to_aggregated_query(request, Local::now().date_naive()) {
        Ok(query) => query,
        Err(e) => return domain_error_response("reading aggregated data", e),
    };

    match state.metrics_service.aggregated_data(query).await {
        Ok(samples) => (
            StatusCode::OK,
            Json(AggregatedDataResponse {
                data: StaffMapper::to_aggregated_samples(samples),
            }),
        )
            .into_response(),
        Err(e) => domain_error_response("reading aggregated data", e),
    }
}

/// Every student with their last recording and weekly mood trend
pub async fn get_student_roster(State(state): State<AppState>, principal: Principal) -> impl IntoResponse {
    info!("GET /api/staff/students");

    if let Err(e) = principal.require(Capability::ViewCohorts) {
        return domain_error_response("building student roster", e);
    }

    match state.roster_service.student_roster(Local::now().date_naive()).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(StudentRosterResponse {
                students: StaffMapper::to_roster(entries),
            }),
        )
            .into_response(),
        Err(e) => domain_error_response("building student roster", e),
    }
}

pub async fn get_overview(State(state): State<AppState>, principal: Principal) -> impl IntoResponse {
    info!("GET /api/staff/overview");

    if let Err(e) = principal.require(Capability::ViewCohorts) {
        return domain_error_response("building staff overview", e);
    }

    match state.roster_service.overview(Local::now().date_naive()).await {
        Ok(overview) => (StatusCode::OK, Json(StaffMapper::to_overview_response(overview))).into_response(),
        Err(e) => domain_error_response("building staff overview", e),
    }
}

/// Per-day wellness and productivity averages of a cohort, or of everyone
pub async fn get_wellness_trends(
    State(state): State<AppState>,
    principal: Principal,
    Query(request): Query<WellnessTrendsRequest>,
) -> impl IntoResponse {
    info!("GET /api/staff/wellness-trends - request: {:?}", request);

    if let Err(e) = principal.require(Capability::ViewCohorts) {
        return domain_error_response("reading wellness trends", e);
    }

    let query = StaffMapper::to_cohort_trends_query(request, Local::now().date_naive());
    match state.metrics_service.cohort_daily_averages(query).await {
        Ok(series) => (
            StatusCode::OK,
            Json(DailyAveragesResponse {
                days: AnalyticsMapper::to_daily_averages(series),
            }),
        )
            .into_response(),
        Err(e) => domain_error_response("reading wellness trends", e),
    }
}

/// A month's cohort mood against the same month a year earlier
pub async fn get_cohort_mood(
    State(state): State<AppState>,
    principal: Principal,
    Query(request): Query<CohortMoodRequest>,
) -> impl IntoResponse {
    info!("GET /api/staff/cohort-mood - request: {:?}", request);

    if let Err(e) = principal.require(Capability::ViewCohorts) {
        return domain_error_response("comparing cohort mood", e);
    }

    match state
        .metrics_service
        .cohort_mood_year_over_year(StaffMapper::to_cohort_mood_query(request))
        .await
    {
        Ok(comparison) => (StatusCode::OK, Json(AnalyticsMapper::to_cohort_mood_response(comparison))).into_response(),
        Err(e) => domain_error_response("comparing cohort mood", e),
    }
}
