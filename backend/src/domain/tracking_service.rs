//! # Tracking Service
//!
//! Accepts student submissions: the structured daily record and the
//! lightweight quick-track mood ping.
//!
//! ## Business Rules
//!
//! - All four catalogue references and the productivity score are required.
//! - Productivity must lie on the configured score scale.
//! - A second daily submission on the same day updates the stored record;
//!   its tags are replaced and the streak is left unchanged.
//! - Quick-track pings are rate limited per student by a rolling cooldown.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{TrackingConfig, MAX_QUICK_TRACK_COOLDOWN_SECONDS};
use crate::domain::commands::tracking::{
    DailyRecordResult, QuickTrackCommand, QuickTrackOutcome, SubmitDailyRecordCommand,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::daily_record::{DailyRecordFields, MetricReference};
use crate::domain::streak_service::StreakService;
use crate::storage::{CatalogueStorage, CohortStorage, Connection, DailyRecordStorage, QuickTrackStorage};

#[derive(Clone)]
pub struct TrackingService<C: Connection> {
    daily_record_repository: C::DailyRecordRepository,
    quick_track_repository: C::QuickTrackRepository,
    catalogue_repository: C::CatalogueRepository,
    cohort_repository: C::CohortRepository,
    streak_service: StreakService<C>,
    config: TrackingConfig,
}

impl<C: Connection> TrackingService<C> {
    pub fn new(connection: Arc<C>, streak_service: StreakService<C>, config: TrackingConfig) -> Self {
        Self {
            daily_record_repository: connection.create_daily_record_repository(),
            quick_track_repository: connection.create_quick_track_repository(),
            catalogue_repository: connection.create_catalogue_repository(),
            cohort_repository: connection.create_cohort_repository(),
            streak_service,
            config,
        }
    }

    /// Store (or update) today's daily record, replace its tags and update the streak.
    pub async fn submit_daily_record(&self, command: SubmitDailyRecordCommand) -> DomainResult<DailyRecordResult> {
        info!("Submitting daily record: {:?}", command);

        let fields = self.validate_fields(&command)?;
        self.ensure_student_exists(command.student_id).await?;

        for (reference, id) in [
            (MetricReference::Mood, fields.mood_id),
            (MetricReference::Exercise, fields.exercise_id),
            (MetricReference::Sleep, fields.sleep_id),
            (MetricReference::Socialisation, fields.socialisation_id),
        ] {
            self.ensure_reference_exists(reference, id).await?;
        }

        let tag_ids: Vec<i64> = command.tag_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let known_tags = self.catalogue_repository.find_tags(&tag_ids).await?;
        if known_tags.len() != tag_ids.len() {
            let missing: Vec<i64> = tag_ids
                .iter()
                .filter(|id| !known_tags.iter().any(|t| t.id == **id))
                .copied()
                .collect();
            return Err(DomainError::NotFound(format!("Unknown tag ids: {:?}", missing)));
        }

        let today = command.now.date();
        let existing = self
            .daily_record_repository
            .find_daily_record(command.student_id, today)
            .await?;

        let daily_record_id = self
            .daily_record_repository
            .upsert_daily_record(command.student_id, today, &fields, command.now)
            .await?;
        self.daily_record_repository.set_tags(daily_record_id, &tag_ids).await?;

        let streak_value = self.streak_service.record_engagement(command.student_id, command.now).await?;

        let updated_existing = existing.is_some();
        let success_message = if updated_existing {
            "Daily record updated".to_string()
        } else {
            "Daily record saved".to_string()
        };
        info!(
            "Daily record {} stored for student {} (streak {})",
            daily_record_id, command.student_id, streak_value
        );

        Ok(DailyRecordResult {
            daily_record_id,
            streak_value,
            updated_existing,
            success_message,
        })
    }

    /// Whether the student already has a daily record for `today`
    pub async fn has_tracked_today(&self, student_id: i64, today: NaiveDate) -> DomainResult<bool> {
        Ok(self
            .daily_record_repository
            .find_daily_record(student_id, today)
            .await?
            .is_some())
    }

    /// Record a mood ping unless the student's cooldown is still running.
    pub async fn quick_track(&self, command: QuickTrackCommand) -> DomainResult<QuickTrackOutcome> {
        info!("Quick track: {:?}", command);

        let mood_id = command
            .mood_id
            .ok_or_else(|| DomainError::Validation("mood_id is required".to_string()))?;
        self.ensure_student_exists(command.student_id).await?;
        self.ensure_reference_exists(MetricReference::Mood, mood_id).await?;

        let cooldown = Duration::seconds(
            self.config
                .quick_track_cooldown_seconds
                .clamp(0, MAX_QUICK_TRACK_COOLDOWN_SECONDS),
        );
        if let Some(last) = self
            .quick_track_repository
            .latest_quick_track_time(command.student_id)
            .await?
        {
            let remaining = (last + cooldown) - command.now;
            if remaining > Duration::zero() {
                let remaining_time_seconds = remaining.min(cooldown).num_seconds();
                warn!(
                    "Quick track cooldown active for student {}: {}s remaining",
                    command.student_id, remaining_time_seconds
                );
                return Ok(QuickTrackOutcome::CooldownActive { remaining_time_seconds });
            }
        }

        let quick_track_id = self
            .quick_track_repository
            .insert_quick_track(command.student_id, mood_id, command.now)
            .await?;
        info!("Quick track {} stored for student {}", quick_track_id, command.student_id);

        Ok(QuickTrackOutcome::Recorded { quick_track_id })
    }

    fn validate_fields(&self, command: &SubmitDailyRecordCommand) -> DomainResult<DailyRecordFields> {
        fn required<T>(value: Option<T>, name: &str) -> DomainResult<T> {
            value.ok_or_else(|| DomainError::Validation(format!("{} is required", name)))
        }

        let productivity_score = required(command.productivity_score, "productivity_score")?;
        if !productivity_score.is_finite()
            || productivity_score < self.config.score_min
            || productivity_score > self.config.score_max
        {
            return Err(DomainError::Validation(format!(
                "productivity_score must be between {} and {}",
                self.config.score_min, self.config.score_max
            )));
        }

        Ok(DailyRecordFields {
            mood_id: required(command.mood_id, "mood_id")?,
            exercise_id: required(command.exercise_id, "exercise_id")?,
            sleep_id: required(command.sleep_id, "sleep_id")?,
            socialisation_id: required(command.socialisation_id, "socialisation_id")?,
            productivity_score,
        })
    }

    async fn ensure_student_exists(&self, student_id: i64) -> DomainResult<()> {
        match self.cohort_repository.find_student(student_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound(format!("Student {} not found", student_id))),
        }
    }

    async fn ensure_reference_exists(&self, reference: MetricReference, id: i64) -> DomainResult<()> {
        match self.catalogue_repository.resolve_score(reference, id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound(format!(
                "Unknown {} id {}",
                reference.label(),
                id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{at, date, TestFixture};
    use crate::storage::DbConnection;
    use chrono::NaiveDateTime;

    async fn setup() -> (TestFixture, TrackingService<DbConnection>, i64) {
        let fixture = TestFixture::new().await;
        let student = fixture.student("S1", 1, 1).await;
        let connection = fixture.connection();
        let streak_service = StreakService::new(connection.clone());
        let service = TrackingService::new(connection, streak_service, TrackingConfig::default());
        (fixture, service, student)
    }

    fn submission(student_id: i64, mood_id: i64, now: NaiveDateTime) -> SubmitDailyRecordCommand {
        SubmitDailyRecordCommand {
            student_id,
            mood_id: Some(mood_id),
            exercise_id: Some(3),
            sleep_id: Some(4),
            socialisation_id: Some(2),
            productivity_score: Some(3.0),
            tag_ids: vec![1],
            now,
        }
    }

    #[tokio::test]
    async fn test_same_day_resubmission_updates_one_record() {
        let (fixture, service, student) = setup().await;

        let first = service
            .submit_daily_record(submission(student, 4, at(2024, 3, 1, 9)))
            .await
            .expect("Failed to submit");
        let mut second_command = submission(student, 2, at(2024, 3, 1, 20));
        second_command.tag_ids = vec![2, 3];
        let second = service
            .submit_daily_record(second_command)
            .await
            .expect("Failed to resubmit");

        assert_eq!(first.daily_record_id, second.daily_record_id);
        assert!(!first.updated_existing);
        assert!(second.updated_existing);
        assert_eq!(first.streak_value, 1);
        assert_eq!(second.streak_value, 1);
        assert_eq!(fixture.tag_ids_of(first.daily_record_id).await, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_missing_reference_is_validation_failure() {
        let (fixture, service, student) = setup().await;
        let mut command = submission(student, 4, at(2024, 3, 1, 9));
        command.sleep_id = None;

        let err = service.submit_daily_record(command).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("sleep_id")));
        assert!(!service
            .has_tracked_today(student, date(2024, 3, 1))
            .await
            .expect("status"));
        assert_eq!(fixture.streak_value(student).await, None);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_not_found() {
        let (_fixture, service, student) = setup().await;
        let command = submission(student, 42, at(2024, 3, 1, 9));

        let err = service.submit_daily_record(command).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(ref m) if m.contains("mood")));
    }

    #[tokio::test]
    async fn test_productivity_outside_scale_is_rejected() {
        let (_fixture, service, student) = setup().await;
        let mut command = submission(student, 4, at(2024, 3, 1, 9));
        command.productivity_score = Some(7.5);

        let err = service.submit_daily_record(command).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_not_found() {
        let (_fixture, service, student) = setup().await;
        let mut command = submission(student, 4, at(2024, 3, 1, 9));
        command.tag_ids = vec![1, 999];

        let err = service.submit_daily_record(command).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(ref m) if m.contains("999")));
    }

    #[tokio::test]
    async fn test_tracking_status_flips_after_submission() {
        let (_fixture, service, student) = setup().await;
        assert!(!service.has_tracked_today(student, date(2024, 3, 1)).await.expect("status"));

        service
            .submit_daily_record(submission(student, 4, at(2024, 3, 1, 9)))
            .await
            .expect("Failed to submit");
        assert!(service.has_tracked_today(student, date(2024, 3, 1)).await.expect("status"));
    }

    #[tokio::test]
    async fn test_quick_track_cooldown_reports_remaining_seconds() {
        let (_fixture, service, student) = setup().await;
        let first_at = at(2024, 3, 1, 9);

        let first = service
            .quick_track(QuickTrackCommand { student_id: student, mood_id: Some(3), now: first_at })
            .await
            .expect("first ping");
        assert!(matches!(first, QuickTrackOutcome::Recorded { .. }));

        let second = service
            .quick_track(QuickTrackCommand {
                student_id: student,
                mood_id: Some(4),
                now: first_at + Duration::minutes(10),
            })
            .await
            .expect("second ping");
        assert_eq!(second, QuickTrackOutcome::CooldownActive { remaining_time_seconds: 3000 });

        let third = service
            .quick_track(QuickTrackCommand {
                student_id: student,
                mood_id: Some(4),
                now: first_at + Duration::seconds(3600),
            })
            .await
            .expect("third ping");
        assert!(matches!(third, QuickTrackOutcome::Recorded { .. }));
    }

    #[tokio::test]
    async fn test_oversized_cooldown_is_capped_at_one_week() {
        let fixture = TestFixture::new().await;
        let student = fixture.student("S1", 1, 1).await;
        let connection = fixture.connection();
        let config = TrackingConfig { quick_track_cooldown_seconds: i64::MAX, ..TrackingConfig::default() };
        let service = TrackingService::new(connection.clone(), StreakService::new(connection), config);
        let first_at = at(2024, 3, 1, 9);

        service
            .quick_track(QuickTrackCommand { student_id: student, mood_id: Some(3), now: first_at })
            .await
            .expect("first ping");
        let second = service
            .quick_track(QuickTrackCommand { student_id: student, mood_id: Some(4), now: first_at + Duration::days(1) })
            .await
            .expect("second ping");

        assert_eq!(
            second,
            QuickTrackOutcome::CooldownActive { remaining_time_seconds: MAX_QUICK_TRACK_COOLDOWN_SECONDS - 86_400 }
        );
    }

    #[tokio::test]
    async fn test_quick_track_requires_known_mood() {
        let (_fixture, service, student) = setup().await;

        let missing = service
            .quick_track(QuickTrackCommand { student_id: student, mood_id: None, now: at(2024, 3, 1, 9) })
            .await
            .unwrap_err();
        assert!(matches!(missing, DomainError::Validation(_)));

        let unknown = service
            .quick_track(QuickTrackCommand { student_id: student, mood_id: Some(77), now: at(2024, 3, 1, 9) })
            .await
            .unwrap_err();
        assert!(matches!(unknown, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_student_is_not_found() {
        let (_fixture, service, _student) = setup().await;
        let err = service
            .submit_daily_record(submission(404, 4, at(2024, 3, 1, 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(ref m) if m.contains("Student")));
    }
}
