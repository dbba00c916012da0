//! Conversions between domain types and the DTOs of the `shared` crate.

pub mod analytics_mapper;
pub mod staff_mapper;
pub mod tracking_mapper;
