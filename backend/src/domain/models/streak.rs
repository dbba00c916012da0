//! Streak state machine.
//!
//! A streak counts consecutive calendar days with at least one daily record.
//! It has two entry points with separate triggers: [`on_submit`] runs after a
//! daily record is stored, [`on_query`] runs when the streak is read and may
//! lapse it to zero. Both are pure; persistence is left to the caller.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Persisted streak row.
#[derive(Debug, Clone, PartialEq)]
pub struct Streak {
    pub student_id: i64,
    pub value: u32,
    pub last_record_time: Option<NaiveDateTime>,
}

impl Streak {
    pub fn state(&self) -> StreakState {
        StreakState {
            value: self.value,
            last_record_date: self.last_record_time.map(|t| t.date()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub value: u32,
    pub last_record_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTransition {
    /// First ever engagement
    Started,
    /// Engagement on the day after the previous one
    Extended { value: u32 },
    /// Repeat submission on a day already counted
    Unchanged { value: u32 },
    /// Gap of at least one full day
    Reset,
}

impl SubmitTransition {
    pub fn value(&self) -> u32 {
        match self {
            SubmitTransition::Started | SubmitTransition::Reset => 1,
            SubmitTransition::Extended { value } | SubmitTransition::Unchanged { value } => *value,
        }
    }

    pub fn changes_state(&self) -> bool {
        !matches!(self, SubmitTransition::Unchanged { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTransition {
    /// A record exists today or yesterday; the stored value stands
    Alive { value: u32 },
    /// No recent record and a positive stored value; persist zero
    Lapsed { previous: u32 },
    /// No recent record and nothing to reset
    Dormant,
}

impl QueryTransition {
    pub fn value(&self) -> u32 {
        match self {
            QueryTransition::Alive { value } => *value,
            QueryTransition::Lapsed { .. } | QueryTransition::Dormant => 0,
        }
    }
}

/// Write-path transition after a daily record for `today` has been stored.
///
/// `latest_prior_record` is the most recent daily record date strictly
/// before `today`. The stored `last_record_date` is also taken into account,
/// so a streak that already counted `today` stays unchanged.
pub fn on_submit(
    current: Option<StreakState>,
    latest_prior_record: Option<NaiveDate>,
    today: NaiveDate,
) -> SubmitTransition {
    if let Some(state) = current {
        if state.last_record_date == Some(today) && state.value > 0 {
            return SubmitTransition::Unchanged { value: state.value };
        }
    }

    let stored_prior = current
        .and_then(|s| s.last_record_date)
        .filter(|d| *d < today);
    let prior = match (latest_prior_record, stored_prior) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    match prior {
        None => SubmitTransition::Started,
        Some(date) if date == today - Duration::days(1) => {
            let value = current.map(|s| s.value).unwrap_or(0) + 1;
            SubmitTransition::Extended { value }
        }
        Some(_) => SubmitTransition::Reset,
    }
}

/// Read-path transition. A streak is alive while the student has recorded
/// today or yesterday; otherwise a positive value lapses to zero.
pub fn on_query(
    current: Option<StreakState>,
    has_record_today: bool,
    has_record_yesterday: bool,
) -> QueryTransition {
    let stored = current.map(|s| s.value).unwrap_or(0);
    if has_record_today || has_record_yesterday {
        QueryTransition::Alive { value: stored }
    } else if stored > 0 {
        QueryTransition::Lapsed { previous: stored }
    } else {
        QueryTransition::Dormant
    }
}
