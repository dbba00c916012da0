//! # Domain Module
//!
//! Business logic for student wellness tracking, independent of HTTP and of
//! the concrete record store.
//!
//! ## Module Organization
//!
//! - **tracking_service**: daily record submission and quick-track pings
//! - **streak_service**: consecutive-day engagement streaks
//! - **metrics_service**: daily series, dashboards, aggregated data
//! - **insight_service**: week over week insights and correlations
//! - **cohort_risk_service**: concerning cohort detection
//! - **roster_service**: staff roster and overview counters
//! - **notification_service** / **email_service**: scheduled emails
//!
//! ## Business Rules
//!
//! - A student has at most one daily record per calendar day; resubmitting
//!   updates it in place
//! - Quick-track pings are rate limited per student
//! - A streak counts consecutive calendar days with a daily record
//! - Analytics treat daily records and quick-track pings as one sample stream
//! - Missing data is reported as absent, never as zero

pub mod cohort_risk_service;
pub mod commands;
pub mod email_service;
pub mod errors;
pub mod insight_service;
pub mod metrics_service;
pub mod models;
pub mod notification_service;
pub mod roster_service;
pub mod streak_service;
pub mod tracking_service;

pub use cohort_risk_service::CohortRiskService;
pub use email_service::SmtpNotificationSender;
pub use errors::{DomainError, DomainResult};
pub use insight_service::InsightService;
pub use metrics_service::MetricsService;
pub use notification_service::{LogNotificationSender, NotificationSender, NotificationService};
pub use roster_service::RosterService;
pub use streak_service::StreakService;
pub use tracking_service::TrackingService;
