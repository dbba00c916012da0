//! # REST API for Wellness Tracking
//!
//! Student submissions: daily records, quick-track pings and the streak.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Local;
use shared::{CooldownResponse, DailyTrackRequest, QuickTrackRequest, StreakResponse, TrackingStatusResponse};
use tracing::info;

use crate::domain::commands::tracking::QuickTrackOutcome;
use crate::domain::models::principal::Principal;
use crate::io::rest::domain_error_response;
use crate::io::rest::mappers::tracking_mapper::TrackingMapper;
use crate::AppState;

/// Create a router for tracking related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily-track", post(submit_daily_track))
        .route("/daily-track/status", get(get_tracking_status))
        .route("/quick-track", post(submit_quick_track))
        .route("/streak/:student_id", get(get_streak))
}

/// Submit (or revise) today's daily record
pub async fn submit_daily_track(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<DailyTrackRequest>,
) -> impl IntoResponse {
    info!("POST /api/daily-track - request: {:?}", request);

    let student_id = match principal.tracking_student() {
        Ok(id) => id,
        Err(e) => return domain_error_response("submitting daily record", e),
    };

    let command = TrackingMapper::to_submit_command(request, student_id, Local::now().naive_local());
    match state.tracking_service.submit_daily_record(command).await {
        Ok(result) => {
            let status = if result.updated_existing {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(TrackingMapper::to_daily_track_response(result))).into_response()
        }
        Err(e) => domain_error_response("submitting daily record", e),
    }
}

/// Whether the caller already has a daily record today
pub async fn get_tracking_status(State(state): State<AppState>, principal: Principal) -> impl IntoResponse {
    info!("GET /api/daily-track/status");

    let student_id = match principal.tracking_student() {
        Ok(id) => id,
        Err(e) => return domain_error_response("reading tracking status", e),
    };

    let today = Local::now().date_naive();
    match state.tracking_service.has_tracked_today(student_id, today).await {
        Ok(already_tracked) => (StatusCode::OK, Json(TrackingStatusResponse { already_tracked })).into_response(),
        Err(e) => domain_error_response("reading tracking status", e),
    }
}

/// Record a quick mood ping, subject to the per-student cooldown
pub async fn submit_quick_track(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<QuickTrackRequest>,
) -> impl IntoResponse {
    info!("POST /api/quick-track - request: {:?}", request);

    let student_id = match principal.tracking_student() {
        Ok(id) => id,
        Err(e) => return domain_error_response("recording quick track", e),
    };

    let command = TrackingMapper::to_quick_track_command(request, student_id, Local::now().naive_local());
    match state.tracking_service.quick_track(command).await {
        Ok(QuickTrackOutcome::Recorded { quick_track_id }) => (
            StatusCode::CREATED,
            Json(TrackingMapper::to_quick_track_response(quick_track_id)),
        )
            .into_response(),
        Ok(QuickTrackOutcome::CooldownActive { remaining_time_seconds }) => {
            info!("Quick track for student {} is cooling down ({}s left)", student_id, remaining_time_seconds);
            (
                StatusCode::CONFLICT,
                [(header::RETRY_AFTER, remaining_time_seconds.to_string())],
                Json(CooldownResponse {
                    message: "Please wait before recording your mood again".to_string(),
                    remaining_time_seconds,
                }),
            )
                .into_response()
        }
        Err(e) => domain_error_response("recording quick track", e),
    }
}

/// Current streak of a student, lapsing it if a day was missed
pub async fn get_streak(
    State(state): State<AppState>,
    principal: Principal,
    Path(student_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/streak/{}", student_id);

    if let Err(e) = principal.authorize_student_access(student_id) {
        return domain_error_response("reading streak", e);
    }

    let today = Local::now().date_naive();
    match state.streak_service.check_streak(student_id, today).await {
        Ok(transition) => (
            StatusCode::OK,
            Json(StreakResponse {
                streak_value: transition.value(),
            }),
        )
            .into_response(),
        Err(e) => domain_error_response("reading streak", e),
    }
}
