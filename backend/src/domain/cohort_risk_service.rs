//! # Cohort Risk Service
//!
//! Flags (course, academic year) cohorts with concerning wellness signals
//! over a trailing window.
//!
//! ## Algorithm
//!
//! 1. **Metric source**: merged daily records and quick-track pings are
//!    averaged per cohort. A cohort is flagged when its mood average is below
//!    the mood threshold or any other metric average is below the metric
//!    threshold. Missing averages never flag.
//! 2. **Tag source**: a cohort is flagged for a tag when the number of
//!    distinct students carrying it reaches the configured share of the
//!    cohort's enrolment.
//! 3. **Merge**: flags are keyed by cohort. A cohort found by both sources is
//!    reported once with metric averages and tags; a tag-only cohort has no
//!    averages.
//! 4. **Enrichment**: each flagged cohort gets its earliest upcoming
//!    assignment. A failed lookup is logged and recorded but never drops the
//!    cohort or stops the others.

use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RiskConfig;
use crate::domain::errors::DomainResult;
use crate::domain::metrics_service::average_samples;
use crate::domain::models::cohort::{CohortKey, CohortRiskReport, ConcerningCohort, TagCount};
use crate::domain::models::daily_record::{MergedRecord, RecordScope};
use crate::domain::models::metrics::{Metric, MetricSnapshot};
use crate::storage::{CohortStorage, Connection, DailyRecordStorage};

/// Metric source: per-cohort averages of the cohorts breaching a threshold
pub fn flag_metric_breaches(records: &[MergedRecord], config: &RiskConfig) -> BTreeMap<CohortKey, MetricSnapshot> {
    let mut by_cohort: BTreeMap<CohortKey, Vec<&MergedRecord>> = BTreeMap::new();
    for record in records {
        let key = CohortKey {
            course_id: record.course_id,
            academic_year_id: record.academic_year_id,
        };
        by_cohort.entry(key).or_default().push(record);
    }

    by_cohort
        .into_iter()
        .map(|(key, samples)| (key, average_samples(samples.iter().copied())))
        .filter(|(_, averages)| is_breach(averages, config))
        .collect()
}

fn is_breach(averages: &MetricSnapshot, config: &RiskConfig) -> bool {
    Metric::ALL.iter().any(|metric| {
        let threshold = match metric {
            Metric::Mood => config.mood_threshold,
            _ => config.metric_threshold,
        };
        averages.get(*metric).map(|v| v < threshold).unwrap_or(false)
    })
}

/// Tag source: tags carried by at least `tag_student_ratio` of a cohort
pub fn flag_tag_breaches(
    tag_counts: &[TagCount],
    cohort_sizes: &BTreeMap<CohortKey, u32>,
    config: &RiskConfig,
) -> BTreeMap<CohortKey, Vec<String>> {
    let mut flagged: BTreeMap<CohortKey, Vec<String>> = BTreeMap::new();
    for count in tag_counts {
        let size = cohort_sizes.get(&count.cohort).copied().unwrap_or(0);
        if size == 0 {
            continue;
        }
        if count.student_count as f64 >= config.tag_student_ratio * size as f64 {
            flagged.entry(count.cohort).or_default().push(count.tag_name.clone());
        }
    }
    flagged
}

/// Union of both sources, one entry per cohort, ordered by cohort key
pub fn merge_concerning_cohorts(
    metric_flags: BTreeMap<CohortKey, MetricSnapshot>,
    mut tag_flags: BTreeMap<CohortKey, Vec<String>>,
    cohort_sizes: &BTreeMap<CohortKey, u32>,
) -> Vec<ConcerningCohort> {
    let mut merged: BTreeMap<CohortKey, ConcerningCohort> = BTreeMap::new();

    for (key, averages) in metric_flags {
        merged.insert(
            key,
            ConcerningCohort {
                cohort: key,
                averages,
                student_count: cohort_sizes.get(&key).copied().unwrap_or(0),
                frequent_tags: tag_flags.remove(&key).unwrap_or_default(),
                earliest_assignment: None,
            },
        );
    }

    for (key, tags) in tag_flags {
        merged.insert(
            key,
            ConcerningCohort {
                cohort: key,
                averages: MetricSnapshot::default(),
                student_count: cohort_sizes.get(&key).copied().unwrap_or(0),
                frequent_tags: tags,
                earliest_assignment: None,
            },
        );
    }

    merged.into_values().collect()
}

/// Attach the earliest upcoming assignment to each cohort. Returns the
/// cohorts whose lookup failed.
pub async fn enrich_with_assignments<S: CohortStorage + ?Sized>(
    cohort_storage: &S,
    cohorts: &mut [ConcerningCohort],
    now: NaiveDateTime,
) -> Vec<CohortKey> {
    let mut failures = Vec::new();
    for cohort in cohorts.iter_mut() {
        match cohort_storage.earliest_upcoming_assignment(cohort.cohort, now).await {
            Ok(assignment) => cohort.earliest_assignment = assignment,
            Err(e) => {
                warn!(
                    "Assignment lookup failed for cohort {:?}, reporting without it: {:#}",
                    cohort.cohort, e
                );
                cohort.earliest_assignment = None;
                failures.push(cohort.cohort);
            }
        }
    }
    failures
}

#[derive(Clone)]
pub struct CohortRiskService<C: Connection> {
    daily_record_repository: C::DailyRecordRepository,
    cohort_repository: C::CohortRepository,
    config: RiskConfig,
}

impl<C: Connection> CohortRiskService<C> {
    pub fn new(connection: Arc<C>, config: RiskConfig) -> Self {
        Self {
            daily_record_repository: connection.create_daily_record_repository(),
            cohort_repository: connection.create_cohort_repository(),
            config,
        }
    }

    /// Concerning cohorts over the window ending on `now`'s date
    pub async fn detect(&self, now: NaiveDateTime) -> DomainResult<CohortRiskReport> {
        let end = now.date();
        let start = end - Duration::days(self.config.window_days);
        info!("Detecting concerning cohorts between {} and {}", start, end);

        let records = self
            .daily_record_repository
            .query_records_in_window(&RecordScope::everyone(), start, end)
            .await?;
        let cohort_sizes: BTreeMap<CohortKey, u32> =
            self.cohort_repository.cohort_sizes().await?.into_iter().collect();
        let tag_counts = self.cohort_repository.tag_counts_by_cohort(start, end).await?;

        let metric_flags = flag_metric_breaches(&records, &self.config);
        let tag_flags = flag_tag_breaches(&tag_counts, &cohort_sizes, &self.config);
        info!(
            "{} cohorts flagged by metrics, {} by tags",
            metric_flags.len(),
            tag_flags.len()
        );

        let mut concerning_cohorts = merge_concerning_cohorts(metric_flags, tag_flags, &cohort_sizes);
        let enrichment_failures = enrich_with_assignments(&self.cohort_repository, &mut concerning_cohorts, now).await;

        Ok(CohortRiskReport {
            is_concerning: !concerning_cohorts.is_empty(),
            concerning_cohorts,
            enrichment_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::cohort::{Assignment, StaffMember, StudentActivity, StudentProfile};
    use crate::storage::test_utils::{at, date, fields, TestFixture};
    use crate::storage::DbConnection;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn key(course_id: i64, academic_year_id: i64) -> CohortKey {
        CohortKey { course_id, academic_year_id }
    }

    fn sample(course_id: i64, mood: f64, sleep: Option<f64>) -> MergedRecord {
        MergedRecord {
            student_id: 1,
            course_id,
            academic_year_id: 1,
            recorded_at: at(2024, 3, 1, 10),
            mood_score: Some(mood),
            exercise_score: None,
            sleep_score: sleep,
            socialisation_score: None,
            productivity_score: None,
        }
    }

    #[test]
    fn test_metric_breaches_use_per_metric_thresholds() {
        let records = vec![
            sample(1, 2.0, Some(4.0)),
            sample(2, 4.0, Some(1.5)),
            sample(3, 4.0, Some(3.0)),
            // Quick-track only cohort: mood fine, other metrics missing
            sample(4, 3.0, None),
        ];

        let flagged = flag_metric_breaches(&records, &RiskConfig::default());
        assert_eq!(flagged.keys().copied().collect::<Vec<_>>(), vec![key(1, 1), key(2, 1)]);
    }

    #[test]
    fn test_tag_breach_at_half_the_cohort() {
        let sizes: BTreeMap<CohortKey, u32> = [(key(1, 1), 4), (key(2, 1), 5)].into_iter().collect();
        let counts = vec![
            TagCount { cohort: key(1, 1), tag_name: "stressed".into(), student_count: 2 },
            TagCount { cohort: key(2, 1), tag_name: "lonely".into(), student_count: 2 },
        ];

        let flagged = flag_tag_breaches(&counts, &sizes, &RiskConfig::default());
        assert_eq!(flagged.get(&key(1, 1)), Some(&vec!["stressed".to_string()]));
        assert!(!flagged.contains_key(&key(2, 1)));
    }

    #[test]
    fn test_merge_keeps_one_entry_per_cohort() {
        let sizes: BTreeMap<CohortKey, u32> =
            [(key(1, 1), 3), (key(2, 1), 2), (key(3, 1), 6)].into_iter().collect();
        let averages = MetricSnapshot { mood: Some(2.0), ..MetricSnapshot::default() };
        let metric_flags: BTreeMap<_, _> = [(key(1, 1), averages), (key(3, 1), averages)].into_iter().collect();
        let tag_flags: BTreeMap<_, _> = [
            (key(2, 1), vec!["lonely".to_string()]),
            (key(3, 1), vec!["stressed".to_string()]),
        ]
        .into_iter()
        .collect();

        let merged = merge_concerning_cohorts(metric_flags, tag_flags, &sizes);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].cohort, key(1, 1));
        assert!(merged[0].frequent_tags.is_empty());
        assert_eq!(merged[1].cohort, key(2, 1));
        assert_eq!(merged[1].averages, MetricSnapshot::default());
        assert_eq!(merged[1].student_count, 2);
        assert_eq!(merged[2].averages.mood, Some(2.0));
        assert_eq!(merged[2].frequent_tags, vec!["stressed".to_string()]);
    }

    /// Cohort storage whose assignment lookup fails for one cohort
    struct FlakyAssignments {
        failing: CohortKey,
    }

    #[async_trait]
    impl CohortStorage for FlakyAssignments {
        async fn list_students(&self) -> anyhow::Result<Vec<StudentProfile>> {
            Ok(Vec::new())
        }
        async fn find_student(&self, _student_id: i64) -> anyhow::Result<Option<StudentProfile>> {
            Ok(None)
        }
        async fn list_student_activity(&self) -> anyhow::Result<Vec<StudentActivity>> {
            Ok(Vec::new())
        }
        async fn cohort_sizes(&self) -> anyhow::Result<Vec<(CohortKey, u32)>> {
            Ok(Vec::new())
        }
        async fn tag_counts_by_cohort(&self, _start: NaiveDate, _end: NaiveDate) -> anyhow::Result<Vec<TagCount>> {
            Ok(Vec::new())
        }
        async fn earliest_upcoming_assignment(
            &self,
            cohort: CohortKey,
            _now: NaiveDateTime,
        ) -> anyhow::Result<Option<Assignment>> {
            if cohort == self.failing {
                Err(anyhow!("connection reset"))
            } else {
                Ok(Some(Assignment {
                    id: 1,
                    name: "Essay".into(),
                    deadline: at(2024, 4, 1, 12),
                }))
            }
        }
        async fn students_inactive_since(
            &self,
            _since: NaiveDate,
            _include_quick_track: bool,
        ) -> anyhow::Result<Vec<StudentProfile>> {
            Ok(Vec::new())
        }
        async fn list_staff(&self) -> anyhow::Result<Vec<StaffMember>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_isolated() {
        let storage = FlakyAssignments { failing: key(1, 1) };
        let mut cohorts: Vec<ConcerningCohort> = [key(1, 1), key(2, 1)]
            .into_iter()
            .map(|k| ConcerningCohort {
                cohort: k,
                averages: MetricSnapshot::default(),
                student_count: 1,
                frequent_tags: Vec::new(),
                earliest_assignment: None,
            })
            .collect();

        let failures = enrich_with_assignments(&storage, &mut cohorts, at(2024, 3, 1, 0)).await;

        assert_eq!(failures, vec![key(1, 1)]);
        assert_eq!(cohorts[0].earliest_assignment, None);
        assert_eq!(cohorts[1].earliest_assignment.as_ref().map(|a| a.name.as_str()), Some("Essay"));
    }

    #[tokio::test]
    async fn test_detect_unions_both_sources() {
        let fixture = TestFixture::new().await;
        // Cohort (1,1): low mood
        let low = fixture.student("S1", 1, 1).await;
        fixture.record_with(low, date(2024, 3, 9), &fields(1, 4)).await;
        fixture.assignment(low, "Lab report", at(2024, 3, 20, 12)).await;
        // Cohort (2,1): healthy metrics but half the cohort stressed
        let a = fixture.student("S2", 2, 1).await;
        let _b = fixture.student("S3", 2, 1).await;
        let record = fixture.record_with(a, date(2024, 3, 9), &fields(4, 4)).await;
        fixture.tag_record(record, "stressed").await;
        // Cohort (3,1): healthy, untagged
        let healthy = fixture.student("S4", 3, 1).await;
        fixture.record_with(healthy, date(2024, 3, 9), &fields(5, 5)).await;

        let service: CohortRiskService<DbConnection> =
            CohortRiskService::new(fixture.connection(), RiskConfig::default());
        let report = service.detect(at(2024, 3, 10, 12)).await.expect("detect");

        assert!(report.is_concerning);
        assert!(report.enrichment_failures.is_empty());
        assert_eq!(report.concerning_cohorts.len(), 2);

        let first = &report.concerning_cohorts[0];
        assert_eq!(first.cohort, key(1, 1));
        assert_eq!(first.averages.mood, Some(1.0));
        assert_eq!(first.earliest_assignment.as_ref().map(|a| a.name.as_str()), Some("Lab report"));

        let second = &report.concerning_cohorts[1];
        assert_eq!(second.cohort, key(2, 1));
        assert_eq!(second.averages.mood, None);
        assert_eq!(second.student_count, 2);
        assert_eq!(second.frequent_tags, vec!["stressed".to_string()]);
    }

    #[tokio::test]
    async fn test_detect_reports_nothing_for_healthy_population() {
        let fixture = TestFixture::new().await;
        let s = fixture.student("S1", 1, 1).await;
        fixture.record_with(s, date(2024, 3, 9), &fields(4, 4)).await;

        let service: CohortRiskService<DbConnection> =
            CohortRiskService::new(fixture.connection(), RiskConfig::default());
        let report = service.detect(at(2024, 3, 10, 12)).await.expect("detect");
        assert!(!report.is_concerning);
        assert!(report.concerning_cohorts.is_empty());
    }
}
