pub mod catalogue_repository;
pub mod cohort_repository;
pub mod daily_record_repository;
pub mod quick_track_repository;
pub mod streak_repository;

pub use catalogue_repository::CatalogueRepository;
pub use cohort_repository::CohortRepository;
pub use daily_record_repository::DailyRecordRepository;
pub use quick_track_repository::QuickTrackRepository;
pub use streak_repository::StreakRepository;
