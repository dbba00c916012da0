//! # Student Pulse Backend
//!
//! Student wellness tracking: daily records, quick mood pings, engagement
//! streaks, personal analytics and cohort level risk detection for staff.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (axum REST API, principal resolution)
//!     ↓
//! Domain Layer (services, pure analytics, notification jobs)
//!     ↓
//! Storage Layer (record store traits, SQLite repositories)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod scheduler;
pub mod storage;

use anyhow::Result;
use axum::{http::Method, middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{
    CohortRiskService, InsightService, MetricsService, NotificationSender, NotificationService, RosterService,
    StreakService, TrackingService,
};
use crate::io::rest::{analytics_apis, principal::principal_from_headers, staff_apis, tracking_apis};
use crate::storage::DbConnection;

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<DbConnection>,
    pub tracking_service: TrackingService<DbConnection>,
    pub streak_service: StreakService<DbConnection>,
    pub metrics_service: MetricsService<DbConnection>,
    pub insight_service: InsightService<DbConnection>,
    pub cohort_risk_service: CohortRiskService<DbConnection>,
    pub roster_service: RosterService<DbConnection>,
    pub trust_principal_headers: bool,
}

impl AppState {
    pub fn new(connection: Arc<DbConnection>, config: &AppConfig) -> Self {
        let streak_service = StreakService::new(connection.clone());
        Self {
            tracking_service: TrackingService::new(connection.clone(), streak_service.clone(), config.tracking.clone()),
            streak_service,
            metrics_service: MetricsService::new(connection.clone(), config.analytics.clone()),
            insight_service: InsightService::new(connection.clone(), config.analytics.clone()),
            cohort_risk_service: CohortRiskService::new(connection.clone(), config.risk.clone()),
            roster_service: RosterService::new(connection.clone()),
            trust_principal_headers: config.trust_principal_headers,
            connection,
        }
    }

    /// Notification jobs sharing this state's services
    pub fn notification_service(
        &self,
        sender: Arc<dyn NotificationSender>,
        config: &AppConfig,
    ) -> NotificationService<DbConnection> {
        NotificationService::new(
            self.connection.clone(),
            self.streak_service.clone(),
            self.metrics_service.clone(),
            self.insight_service.clone(),
            self.cohort_risk_service.clone(),
            sender,
            config.notifications.clone(),
        )
    }
}

/// Open the database and build the application state
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let connection = Arc::new(DbConnection::new(&config.database_url).await?);

    info!("Setting up domain services");
    Ok(AppState::new(connection, config))
}

/// Create the Axum router with all routes configured.
///
/// Principal headers are only honoured when the state trusts them; otherwise
/// an upstream layer must insert the [`Principal`](crate::domain::models::principal::Principal).
pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .merge(tracking_apis::router())
        .merge(analytics_apis::router())
        .nest("/staff", staff_apis::router());

    let mut router = Router::new().nest("/api", api_routes);
    if app_state.trust_principal_headers {
        router = router.layer(middleware::from_fn(principal_from_headers));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
