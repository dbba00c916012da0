use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use student_pulse::config::AppConfig;
use student_pulse::domain::{LogNotificationSender, NotificationSender, SmtpNotificationSender};
use student_pulse::{create_router, initialize_backend, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = AppConfig::default_path();
    let config = AppConfig::load_or_default(&config_path);

    let app_state = initialize_backend(&config).await?;

    if config.trust_principal_headers {
        warn!("Trusting principal headers from clients, run only behind an authenticating gateway");
    }

    if config.notifications.enabled {
        let sender: Arc<dyn NotificationSender> = match SmtpNotificationSender::new(&config.email) {
            Ok(sender) => Arc::new(sender),
            Err(e) => {
                warn!("📧 Email delivery unavailable, notifications will only be logged: {:#}", e);
                Arc::new(LogNotificationSender)
            }
        };
        let notification_service = app_state.notification_service(sender, &config);
        scheduler::spawn_daily_jobs(notification_service, config.notifications.run_at_hour);
    } else {
        info!("Scheduled notifications are disabled");
    }

    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
