//! # Storage Module
//!
//! The record store behind the domain services: daily records, quick-track
//! pings, streak rows, tag and score catalogues, and cohort level views.
//!
//! Domain code depends only on the traits in [`traits`]; [`DbConnection`] is
//! the SQLite implementation and hands out one repository per concern.
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: one repository per table family
//! - **Bound parameters only**: dynamic filters are `? IS NULL OR col = ?`
//!   predicates, never string interpolation of caller input
//! - **Conditional writes**: the streak row is only updated through a
//!   compare-and-swap so concurrent submissions cannot double count

pub mod connection;
pub mod repositories;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use connection::DbConnection;
pub use repositories::{
    CatalogueRepository, CohortRepository, DailyRecordRepository, QuickTrackRepository, StreakRepository,
};
pub use traits::{
    CatalogueStorage, CohortStorage, Connection, DailyRecordStorage, QuickTrackStorage, StreakStorage,
};
