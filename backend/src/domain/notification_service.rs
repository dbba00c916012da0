//! # Notification Service
//!
//! Scheduled jobs that decide who should be emailed and with which facts.
//! Delivery itself goes through a [`NotificationSender`].
//!
//! ## Jobs
//!
//! - **Streak lapse check**: reads every streak; students whose streak lapsed
//!   on this read are told so.
//! - **Student reminders**: students without a daily record in the reminder
//!   period get a nudge.
//! - **Staff alerts**: students with neither daily records nor quick-track
//!   pings in the alert period are reported to every staff member.
//! - **Weekly summaries**: on the configured weekday, students with data this
//!   week receive their averages and insights.
//! - **Cohort risk alert**: staff are told about concerning cohorts.
//!
//! One failing recipient never stops a job; it is counted in the
//! [`JobSummary`] and logged.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::NotificationConfig;
use crate::domain::cohort_risk_service::CohortRiskService;
use crate::domain::errors::DomainResult;
use crate::domain::insight_service::InsightService;
use crate::domain::metrics_service::{window_averages, MetricsService};
use crate::domain::models::cohort::{CohortRiskReport, StaffMember, StudentProfile};
use crate::domain::models::daily_record::RecordScope;
use crate::domain::models::insight::Insight;
use crate::domain::models::metrics::{Metric, MetricSnapshot};
use crate::domain::models::streak::QueryTransition;
use crate::domain::streak_service::StreakService;
use crate::storage::{CohortStorage, Connection};

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Email delivery boundary
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Sender used when delivery is disabled: logs instead of sending
#[derive(Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!("📧 (not sent) to={} subject=\"{}\"", email.to, email.subject);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub considered: u32,
    pub notified: u32,
    pub failed: u32,
}

impl JobSummary {
    fn record(&mut self, delivered: bool) {
        if delivered {
            self.notified += 1;
        } else {
            self.failed += 1;
        }
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "no data".to_string())
}

fn email(to: &str, subject: String, lines: &[String]) -> OutgoingEmail {
    let html = lines
        .iter()
        .map(|line| format!("<p>{}</p>", line))
        .collect::<Vec<_>>()
        .join("\n");
    OutgoingEmail {
        to: to.to_string(),
        subject,
        text_body: lines.join("\n\n"),
        html_body: html,
    }
}

fn describe_insight(insight: &Insight) -> String {
    match insight {
        Insight::InsufficientData => "Not enough data yet to compare weeks.".to_string(),
        Insight::Improved { metric, previous_average, current_average } => format!(
            "Your {} improved from {:.1} to {:.1}.",
            metric, previous_average, current_average
        ),
        Insight::Declined { metric, previous_average, current_average } => format!(
            "Your {} dropped from {:.1} to {:.1}.",
            metric, previous_average, current_average
        ),
        Insight::Advisory { driver, outcome, .. } => format!(
            "Better {} seems to go with better {}; both are low this week.",
            driver, outcome
        ),
    }
}

#[derive(Clone)]
pub struct NotificationService<C: Connection> {
    cohort_repository: C::CohortRepository,
    streak_service: StreakService<C>,
    metrics_service: MetricsService<C>,
    insight_service: InsightService<C>,
    cohort_risk_service: CohortRiskService<C>,
    sender: Arc<dyn NotificationSender>,
    config: NotificationConfig,
}

impl<C: Connection> NotificationService<C> {
    pub fn new(
        connection: Arc<C>,
        streak_service: StreakService<C>,
        metrics_service: MetricsService<C>,
        insight_service: InsightService<C>,
        cohort_risk_service: CohortRiskService<C>,
        sender: Arc<dyn NotificationSender>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            cohort_repository: connection.create_cohort_repository(),
            streak_service,
            metrics_service,
            insight_service,
            cohort_risk_service,
            sender,
            config,
        }
    }

    async fn deliver(&self, email: OutgoingEmail) -> bool {
        match self.sender.send(&email).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to deliver \"{}\" to {}: {:#}", email.subject, email.to, e);
                false
            }
        }
    }

    /// Run every job for the day of `now`, logging each summary
    pub async fn run_daily_jobs(&self, now: NaiveDateTime) {
        let today = now.date();
        info!("Running scheduled notification jobs for {}", today);

        let results = [
            ("streak lapse check", self.run_streak_lapse_check(today).await),
            ("student reminders", self.run_student_reminders(today).await),
            ("staff inactivity alerts", self.run_staff_alerts(today).await),
            ("weekly summaries", self.run_weekly_summaries(today).await),
            ("cohort risk alert", self.run_cohort_risk_alert(now).await),
        ];

        for (job, result) in results {
            match result {
                Ok(summary) => info!(
                    "Job {}: considered={} notified={} failed={}",
                    job, summary.considered, summary.notified, summary.failed
                ),
                Err(e) => error!("Job {} failed: {}", job, e),
            }
        }
    }

    pub async fn run_streak_lapse_check(&self, today: NaiveDate) -> DomainResult<JobSummary> {
        let students = self.cohort_repository.list_students().await?;
        let mut summary = JobSummary::default();

        for student in students {
            summary.considered += 1;
            match self.streak_service.check_streak(student.id, today).await {
                Ok(QueryTransition::Lapsed { previous }) => {
                    let message = email(
                        &student.email,
                        "Your wellness streak has ended".to_string(),
                        &[
                            format!("Hi {},", student.name),
                            format!("Your {}-day tracking streak ended because a day was missed.", previous),
                            format!("Start a new one today: {}", self.config.frontend_url),
                        ],
                    );
                    let delivered = self.deliver(message).await;
                    summary.record(delivered);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Streak check failed for student {}: {}", student.id, e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    pub async fn run_student_reminders(&self, today: NaiveDate) -> DomainResult<JobSummary> {
        let days = self.config.student_reminder_days;
        let since = today - Duration::days(days);
        let inactive = self.cohort_repository.students_inactive_since(since, false).await?;
        let mut summary = JobSummary::default();

        for student in inactive {
            summary.considered += 1;
            let message = email(
                &student.email,
                "We miss your check-ins".to_string(),
                &[
                    format!("Hi {},", student.name),
                    format!("You have not logged a daily record in the last {} days.", days),
                    format!("It only takes a minute: {}", self.config.frontend_url),
                ],
            );
            let delivered = self.deliver(message).await;
            summary.record(delivered);
        }
        Ok(summary)
    }

    pub async fn run_staff_alerts(&self, today: NaiveDate) -> DomainResult<JobSummary> {
        let days = self.config.staff_alert_days;
        let since = today - Duration::days(days);
        let inactive = self.cohort_repository.students_inactive_since(since, true).await?;
        let mut summary = JobSummary::default();
        if inactive.is_empty() {
            return Ok(summary);
        }

        let staff = self.cohort_repository.list_staff().await?;
        for student in &inactive {
            summary.considered += 1;
            for member in &staff {
                let delivered = self.deliver(self.inactivity_alert(member, student, days)).await;
                summary.record(delivered);
            }
        }
        Ok(summary)
    }

    fn inactivity_alert(&self, member: &StaffMember, student: &StudentProfile, days: i64) -> OutgoingEmail {
        email(
            &member.email,
            format!("Inactive student: {} ({})", student.name, student.student_number),
            &[
                format!("Hi {},", member.name),
                format!(
                    "{} ({}) has not recorded any wellness data in the last {} days.",
                    student.name, student.student_number, days
                ),
                format!("Course {}, academic year {}.", student.cohort.course_id, student.cohort.academic_year_id),
            ],
        )
    }

    /// Summary of the seven days ending `today`, `None` when the student recorded nothing
    async fn weekly_summary_for(
        &self,
        student: &StudentProfile,
        today: NaiveDate,
    ) -> DomainResult<Option<OutgoingEmail>> {
        let week_start = today - Duration::days(6);
        let series = self
            .metrics_service
            .daily_series(&RecordScope::student(student.id), week_start, today)
            .await?;
        if series.is_empty() {
            return Ok(None);
        }

        let averages = window_averages(&series);
        let report = self.insight_service.insights(student.id, today).await?;
        Ok(Some(weekly_summary_email(student, &averages, &report.insights)))
    }

    pub async fn run_weekly_summaries(&self, today: NaiveDate) -> DomainResult<JobSummary> {
        let mut summary = JobSummary::default();
        if today.weekday() != self.config.weekly_summary_weekday {
            return Ok(summary);
        }

        let students = self.cohort_repository.list_students().await?;
        for student in students {
            match self.weekly_summary_for(&student, today).await {
                Ok(Some(message)) => {
                    summary.considered += 1;
                    let delivered = self.deliver(message).await;
                    summary.record(delivered);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Weekly summary failed for student {}: {}", student.id, e);
                    summary.considered += 1;
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    pub async fn run_cohort_risk_alert(&self, now: NaiveDateTime) -> DomainResult<JobSummary> {
        let report = self.cohort_risk_service.detect(now).await?;
        let mut summary = JobSummary::default();
        if !report.is_concerning {
            return Ok(summary);
        }

        let staff = self.cohort_repository.list_staff().await?;
        for member in &staff {
            summary.considered += 1;
            let delivered = self.deliver(cohort_risk_email(member, &report)).await;
            summary.record(delivered);
        }
        Ok(summary)
    }
}

fn weekly_summary_email(student: &StudentProfile, averages: &MetricSnapshot, insights: &[Insight]) -> OutgoingEmail {
    let mut lines = vec![format!("Hi {}, here is your week:", student.name)];
    for metric in Metric::ALL {
        lines.push(format!("Average {}: {}", metric, format_value(averages.get(metric))));
    }
    lines.extend(insights.iter().map(describe_insight));
    email(&student.email, "Your weekly wellness summary".to_string(), &lines)
}

fn cohort_risk_email(member: &StaffMember, report: &CohortRiskReport) -> OutgoingEmail {
    let mut lines = vec![format!(
        "Hi {}, {} cohort(s) show concerning wellness signals:",
        member.name,
        report.concerning_cohorts.len()
    )];
    for cohort in &report.concerning_cohorts {
        let mut line = format!(
            "Course {} / year {} ({} students): mood {}, exercise {}, sleep {}, socialisation {}, productivity {}",
            cohort.cohort.course_id,
            cohort.cohort.academic_year_id,
            cohort.student_count,
            format_value(cohort.averages.mood),
            format_value(cohort.averages.exercise),
            format_value(cohort.averages.sleep),
            format_value(cohort.averages.socialisation),
            format_value(cohort.averages.productivity),
        );
        if !cohort.frequent_tags.is_empty() {
            line.push_str(&format!("; frequent tags: {}", cohort.frequent_tags.join(", ")));
        }
        if let Some(assignment) = &cohort.earliest_assignment {
            line.push_str(&format!(
                "; next deadline: {} on {}",
                assignment.name,
                assignment.deadline.format("%d %B %Y %H:%M")
            ));
        }
        lines.push(line);
    }
    email(&member.email, "Concerning cohort wellness".to_string(), &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyticsConfig, RiskConfig};
    use crate::domain::models::daily_record::{DailyRecord, DailyRecordFields, MergedRecord};
    use crate::storage::test_utils::{at, date, fields, TestFixture};
    use crate::storage::{
        CatalogueRepository, CohortRepository, DailyRecordRepository, DailyRecordStorage, DbConnection,
        QuickTrackRepository, StreakRepository,
    };
    use anyhow::anyhow;
    use chrono::Weekday;
    use std::sync::Mutex;

    /// Captures emails; fails for one address when asked to
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<OutgoingEmail>>,
        reject: Option<String>,
    }

    impl RecordingSender {
        fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, email: &OutgoingEmail) -> Result<()> {
            if self.reject.as_deref() == Some(email.to.as_str()) {
                return Err(anyhow!("mailbox unavailable"));
            }
            self.sent.lock().expect("lock").push(email.clone());
            Ok(())
        }
    }

    fn service(
        fixture: &TestFixture,
        sender: Arc<RecordingSender>,
        config: NotificationConfig,
    ) -> NotificationService<DbConnection> {
        let connection = fixture.connection();
        NotificationService::new(
            connection.clone(),
            StreakService::new(connection.clone()),
            MetricsService::new(connection.clone(), AnalyticsConfig::default()),
            InsightService::new(connection.clone(), AnalyticsConfig::default()),
            CohortRiskService::new(connection.clone(), RiskConfig::default()),
            sender,
            config,
        )
    }

    #[tokio::test]
    async fn test_streak_lapse_notifies_only_lapsed_students() {
        let fixture = TestFixture::new().await;
        let lapsed = fixture.student("S1", 1, 1).await;
        let alive = fixture.student("S2", 1, 1).await;
        fixture.record(lapsed, date(2024, 3, 1), 3, 3).await;
        fixture.streak(lapsed, 4, Some(at(2024, 3, 1, 10))).await;
        fixture.record(alive, date(2024, 3, 9), 3, 3).await;
        fixture.streak(alive, 2, Some(at(2024, 3, 9, 10))).await;

        let sender = Arc::new(RecordingSender::default());
        let service = service(&fixture, sender.clone(), NotificationConfig::default());
        let summary = service.run_streak_lapse_check(date(2024, 3, 10)).await.expect("job");

        assert_eq!(summary, JobSummary { considered: 2, notified: 1, failed: 0 });
        let sent = sender.sent();
        assert_eq!(sent[0].to, "s1@students.example.ac.uk");
        assert!(sent[0].text_body.contains("4-day"));
        assert_eq!(fixture.streak_value(lapsed).await, Some(0));
    }

    #[tokio::test]
    async fn test_staff_alert_counts_quick_tracks_as_activity() {
        let fixture = TestFixture::new().await;
        fixture.student("S1", 1, 1).await;
        let pinging = fixture.student("S2", 1, 1).await;
        fixture.quick_track(pinging, at(2024, 3, 8, 9), 3).await;
        fixture.staff("Dr Tutor", "tutor@example.ac.uk").await;
        fixture.staff("Dr Head", "head@example.ac.uk").await;

        let sender = Arc::new(RecordingSender::default());
        let service = service(&fixture, sender.clone(), NotificationConfig::default());
        let summary = service.run_staff_alerts(date(2024, 3, 10)).await.expect("job");

        assert_eq!(summary, JobSummary { considered: 1, notified: 2, failed: 0 });
        assert!(sender.sent().iter().all(|e| e.subject.contains("S1")));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_the_job() {
        let fixture = TestFixture::new().await;
        fixture.student("S1", 1, 1).await;
        fixture.student("S2", 1, 1).await;

        let sender = Arc::new(RecordingSender {
            reject: Some("s1@students.example.ac.uk".to_string()),
            ..RecordingSender::default()
        });
        let service = service(&fixture, sender.clone(), NotificationConfig::default());
        let summary = service.run_student_reminders(date(2024, 3, 10)).await.expect("job");

        assert_eq!(summary, JobSummary { considered: 2, notified: 1, failed: 1 });
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_weekly_summary_runs_on_configured_weekday_only() {
        let fixture = TestFixture::new().await;
        let student = fixture.student("S1", 1, 1).await;
        fixture.record_with(student, date(2024, 3, 10), &fields(4, 3)).await;
        fixture.student("S2", 1, 1).await;

        let config = NotificationConfig {
            weekly_summary_weekday: Weekday::Sun,
            ..NotificationConfig::default()
        };
        let sender = Arc::new(RecordingSender::default());
        let service = service(&fixture, sender.clone(), config);

        // 2024-03-09 is a Saturday
        let skipped = service.run_weekly_summaries(date(2024, 3, 9)).await.expect("job");
        assert_eq!(skipped, JobSummary::default());

        let summary = service.run_weekly_summaries(date(2024, 3, 10)).await.expect("job");
        assert_eq!(summary, JobSummary { considered: 1, notified: 1, failed: 0 });
        assert!(sender.sent()[0].text_body.contains("Average mood: 4.0"));
    }

    /// SQLite connection whose record window query fails for one student
    #[derive(Clone)]
    struct FlakyConnection {
        inner: DbConnection,
        failing_student: i64,
    }

    #[derive(Clone)]
    struct FlakyDailyRecords {
        inner: DailyRecordRepository,
        failing_student: i64,
    }

    #[async_trait]
    impl DailyRecordStorage for FlakyDailyRecords {
        async fn find_daily_record(&self, student_id: i64, date: NaiveDate) -> Result<Option<DailyRecord>> {
            self.inner.find_daily_record(student_id, date).await
        }
        async fn find_latest_record_date_before(&self, student_id: i64, date: NaiveDate) -> Result<Option<NaiveDate>> {
            self.inner.find_latest_record_date_before(student_id, date).await
        }
        async fn upsert_daily_record(
            &self,
            student_id: i64,
            date: NaiveDate,
            fields: &DailyRecordFields,
            recorded_at: NaiveDateTime,
        ) -> Result<i64> {
            self.inner.upsert_daily_record(student_id, date, fields, recorded_at).await
        }
        async fn set_tags(&self, daily_record_id: i64, tag_ids: &[i64]) -> Result<()> {
            self.inner.set_tags(daily_record_id, tag_ids).await
        }
        async fn query_records_in_window(
            &self,
            scope: &RecordScope,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<MergedRecord>> {
            if scope.student_id == Some(self.failing_student) {
                return Err(anyhow!("disk I/O error"));
            }
            self.inner.query_records_in_window(scope, start, end).await
        }
        async fn count_students_recorded_on(&self, date: NaiveDate) -> Result<u32> {
            self.inner.count_students_recorded_on(date).await
        }
    }

    impl Connection for FlakyConnection {
        type DailyRecordRepository = FlakyDailyRecords;
        type QuickTrackRepository = QuickTrackRepository;
        type StreakRepository = StreakRepository;
        type CatalogueRepository = CatalogueRepository;
        type CohortRepository = CohortRepository;

        fn create_daily_record_repository(&self) -> Self::DailyRecordRepository {
            FlakyDailyRecords {
                inner: self.inner.create_daily_record_repository(),
                failing_student: self.failing_student,
            }
        }
        fn create_quick_track_repository(&self) -> Self::QuickTrackRepository {
            self.inner.create_quick_track_repository()
        }
        fn create_streak_repository(&self) -> Self::StreakRepository {
            self.inner.create_streak_repository()
        }
        fn create_catalogue_repository(&self) -> Self::CatalogueRepository {
            self.inner.create_catalogue_repository()
        }
        fn create_cohort_repository(&self) -> Self::CohortRepository {
            self.inner.create_cohort_repository()
        }
    }

    #[tokio::test]
    async fn test_weekly_summary_failure_is_isolated_per_student() {
        let fixture = TestFixture::new().await;
        let broken = fixture.student("S1", 1, 1).await;
        let healthy = fixture.student("S2", 1, 1).await;
        fixture.record_with(broken, date(2024, 3, 10), &fields(2, 3)).await;
        fixture.record_with(healthy, date(2024, 3, 10), &fields(4, 3)).await;

        let connection = Arc::new(FlakyConnection {
            inner: fixture.db.clone(),
            failing_student: broken,
        });
        let sender = Arc::new(RecordingSender::default());
        let config = NotificationConfig {
            weekly_summary_weekday: Weekday::Sun,
            ..NotificationConfig::default()
        };
        let service = NotificationService::new(
            connection.clone(),
            StreakService::new(connection.clone()),
            MetricsService::new(connection.clone(), AnalyticsConfig::default()),
            InsightService::new(connection.clone(), AnalyticsConfig::default()),
            CohortRiskService::new(connection.clone(), RiskConfig::default()),
            sender.clone(),
            config,
        );

        let summary = service.run_weekly_summaries(date(2024, 3, 10)).await.expect("job");

        assert_eq!(summary, JobSummary { considered: 2, notified: 1, failed: 1 });
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "s2@students.example.ac.uk");
    }

    #[tokio::test]
    async fn test_cohort_risk_alert_reaches_every_staff_member() {
        let fixture = TestFixture::new().await;
        let s = fixture.student("S1", 1, 1).await;
        fixture.record_with(s, date(2024, 3, 9), &fields(1, 1)).await;
        fixture.staff("Dr Tutor", "tutor@example.ac.uk").await;

        let sender = Arc::new(RecordingSender::default());
        let service = service(&fixture, sender.clone(), NotificationConfig::default());
        let summary = service.run_cohort_risk_alert(at(2024, 3, 10, 0)).await.expect("job");

        assert_eq!(summary.notified, 1);
        assert!(sender.sent()[0].text_body.contains("Course 1 / year 1"));
    }
}
