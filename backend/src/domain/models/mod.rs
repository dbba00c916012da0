pub mod cohort;
pub mod daily_record;
pub mod insight;
pub mod metrics;
pub mod principal;
pub mod streak;
