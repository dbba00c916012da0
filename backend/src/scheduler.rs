//! Daily background loop driving the notification jobs.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::NotificationService;
use crate::storage::Connection;

/// First occurrence of `hour:00` strictly after `now`.
/// Hours above 23 are clamped to 23.
pub fn next_run_after(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let run_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today_run = now.date().and_time(run_time);
    if today_run > now {
        today_run
    } else {
        today_run + Duration::days(1)
    }
}

/// Spawn the daily job loop. Each iteration sleeps until the next run time
/// in local time, then runs every job once.
pub fn spawn_daily_jobs<C: Connection>(service: NotificationService<C>, run_at_hour: u32) -> JoinHandle<()> {
    info!("Starting notification scheduler, daily at {:02}:00", run_at_hour);

    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, run_at_hour);
            let wait = match (next - now).to_std() {
                Ok(wait) => wait,
                Err(e) => {
                    warn!("Could not compute scheduler delay, retrying in a minute: {}", e);
                    std::time::Duration::from_secs(60)
                }
            };
            info!("Next notification run at {}", next);
            tokio::time::sleep(wait).await;

            service.run_daily_jobs(Local::now().naive_local()).await;
        }
    })
}
