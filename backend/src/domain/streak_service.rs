//! # Streak Service
//!
//! Maintains the consecutive-day engagement counter of each student.
//!
//! ## Key Responsibilities
//!
//! - **Write path**: [`StreakService::record_engagement`] runs after a daily
//!   record is stored and extends, keeps or resets the streak.
//! - **Read path**: [`StreakService::check_streak`] reports the streak and
//!   persists zero once a full day has been missed.
//!
//! ## Business Rules
//!
//! - Days are server-local calendar dates.
//! - A repeat submission on the same day leaves the value unchanged.
//! - A streak stays alive until the end of the day after the last record.
//! - Every write is a compare-and-swap against the row that was read; a lost
//!   swap re-reads and recomputes, so concurrent submissions never double count.

use anyhow::anyhow;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::streak::{on_query, on_submit, QueryTransition, Streak};
use crate::storage::{Connection, DailyRecordStorage, StreakStorage};

const MAX_SWAP_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct StreakService<C: Connection> {
    streak_repository: C::StreakRepository,
    daily_record_repository: C::DailyRecordRepository,
}

impl<C: Connection> StreakService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            streak_repository: connection.create_streak_repository(),
            daily_record_repository: connection.create_daily_record_repository(),
        }
    }

    /// Update the streak after a daily record for `now.date()` was stored.
    /// Returns the resulting streak value.
    pub async fn record_engagement(&self, student_id: i64, now: NaiveDateTime) -> DomainResult<u32> {
        let today = now.date();

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let stored = self.streak_repository.find_streak(student_id).await?;
            let latest_prior = self
                .daily_record_repository
                .find_latest_record_date_before(student_id, today)
                .await?;

            let transition = on_submit(stored.as_ref().map(Streak::state), latest_prior, today);
            debug!("Streak transition for student {}: {:?}", student_id, transition);

            let swapped = self
                .streak_repository
                .compare_and_swap_streak(student_id, stored.as_ref(), transition.value(), Some(now))
                .await?;

            if swapped {
                if transition.changes_state() {
                    info!(
                        "Streak for student {} is now {} ({:?})",
                        student_id,
                        transition.value(),
                        transition
                    );
                } else {
                    debug!("Streak for student {} unchanged at {}", student_id, transition.value());
                }
                return Ok(transition.value());
            }

            warn!(
                "Streak of student {} changed concurrently, retrying ({}/{})",
                student_id, attempt, MAX_SWAP_ATTEMPTS
            );
        }

        Err(DomainError::Storage(anyhow!(
            "Streak update for student {} kept conflicting",
            student_id
        )))
    }

    /// Current streak value; lapses it to zero when no record exists for
    /// today or yesterday.
    pub async fn current_streak(&self, student_id: i64, today: NaiveDate) -> DomainResult<u32> {
        Ok(self.check_streak(student_id, today).await?.value())
    }

    /// Like [`Self::current_streak`] but tells whether this read lapsed the streak.
    pub async fn check_streak(&self, student_id: i64, today: NaiveDate) -> DomainResult<QueryTransition> {
        let yesterday = today - Duration::days(1);

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let stored = self.streak_repository.find_streak(student_id).await?;
            let has_today = self
                .daily_record_repository
                .find_daily_record(student_id, today)
                .await?
                .is_some();
            let has_yesterday = has_today
                || self
                    .daily_record_repository
                    .find_daily_record(student_id, yesterday)
                    .await?
                    .is_some();

            let transition = on_query(stored.as_ref().map(Streak::state), has_today, has_yesterday);

            let (QueryTransition::Lapsed { previous }, Some(current)) = (transition, stored.as_ref()) else {
                return Ok(transition);
            };

            let swapped = self
                .streak_repository
                .compare_and_swap_streak(student_id, Some(current), 0, current.last_record_time)
                .await?;
            if swapped {
                info!("Streak of student {} lapsed from {} to 0", student_id, previous);
                return Ok(transition);
            }

            warn!(
                "Streak of student {} changed while lapsing, retrying ({}/{})",
                student_id, attempt, MAX_SWAP_ATTEMPTS
            );
        }

        Err(DomainError::Storage(anyhow!(
            "Streak lapse for student {} kept conflicting",
            student_id
        )))
    }
}
