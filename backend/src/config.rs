//! Application configuration loaded from a TOML file.
//!
//! Every field has a default, so a partial file only overrides what it names.
//! A missing or invalid file falls back to the defaults with a warning.

use anyhow::{anyhow, Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "STUDENT_PULSE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "student_pulse.toml";

/// Upper bound for the quick-track cooldown: one week
pub const MAX_QUICK_TRACK_COOLDOWN_SECONDS: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Resolve the caller from `x-principal-role`/`x-principal-id`. Only safe
    /// behind a gateway that strips these headers from client requests.
    pub trust_principal_headers: bool,
    pub tracking: TrackingConfig,
    pub analytics: AnalyticsConfig,
    pub risk: RiskConfig,
    pub notifications: NotificationConfig,
    pub email: EmailConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:student_pulse.db".to_string(),
            bind_address: "127.0.0.1:8000".to_string(),
            trust_principal_headers: false,
            tracking: TrackingConfig::default(),
            analytics: AnalyticsConfig::default(),
            risk: RiskConfig::default(),
            notifications: NotificationConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Minimum time between two quick-track pings of one student
    pub quick_track_cooldown_seconds: i64,
    pub score_min: f64,
    pub score_max: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            quick_track_cooldown_seconds: 3600,
            score_min: 1.0,
            score_max: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Averages below this count as "low" for advisories
    pub low_value_threshold: f64,
    pub correlation_threshold: f64,
    pub weekly_window_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            low_value_threshold: 3.0,
            correlation_threshold: 0.5,
            weekly_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub window_days: i64,
    pub mood_threshold: f64,
    /// Threshold for exercise, sleep, socialisation and productivity
    pub metric_threshold: f64,
    /// Share of a cohort that must carry a tag for it to be flagged
    pub tag_student_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_days: 14,
            mood_threshold: 2.5,
            metric_threshold: 2.0,
            tag_student_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Local hour at which the daily jobs run
    pub run_at_hour: u32,
    pub weekly_summary_weekday: Weekday,
    pub student_reminder_days: i64,
    pub staff_alert_days: i64,
    pub frontend_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_at_hour: 0,
            weekly_summary_weekday: Weekday::Mon,
            student_reminder_days: 5,
            staff_alert_days: 14,
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
        }
    }
}

impl AppConfig {
    /// Path from `STUDENT_PULSE_CONFIG`, or `student_pulse.toml`
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: AppConfig =
            toml::from_str(&config_content).with_context(|| "Failed to parse config TOML")?;

        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(config_path: &Path) -> Self {
        match Self::load(config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                config
            }
            Err(e) => {
                warn!("Failed to load config from {:?}: {:#}", config_path, e);
                info!("Using default configuration");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracking.score_min >= self.tracking.score_max {
            return Err(anyhow!(
                "score_min ({}) must be below score_max ({})",
                self.tracking.score_min,
                self.tracking.score_max
            ));
        }
        if !(0..=MAX_QUICK_TRACK_COOLDOWN_SECONDS).contains(&self.tracking.quick_track_cooldown_seconds) {
            return Err(anyhow!(
                "quick_track_cooldown_seconds must be between 0 and {}",
                MAX_QUICK_TRACK_COOLDOWN_SECONDS
            ));
        }
        if self.analytics.weekly_window_days <= 0 || self.risk.window_days <= 0 {
            return Err(anyhow!("Analytics windows must be at least one day"));
        }
        if self.notifications.student_reminder_days <= 0 || self.notifications.staff_alert_days <= 0 {
            return Err(anyhow!("Inactivity thresholds must be at least one day"));
        }
        if !(self.risk.tag_student_ratio > 0.0 && self.risk.tag_student_ratio <= 1.0) {
            return Err(anyhow!("tag_student_ratio must be in (0, 1]"));
        }
        if self.notifications.run_at_hour > 23 {
            return Err(anyhow!("run_at_hour must be between 0 and 23"));
        }
        if self.notifications.enabled && self.email.from_email.is_empty() {
            return Err(anyhow!("From email is required when notifications are enabled"));
        }
        Ok(())
    }
}
