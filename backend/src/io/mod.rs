//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: axum routers for tracking, analytics and staff views
//! - **Principal Resolution**: turning request metadata into a [`Principal`](crate::domain::models::principal::Principal)
//! - **Error Translation**: mapping domain errors to HTTP status codes
//! - **DTO Mapping**: converting domain results into the `shared` crate types

pub mod rest;
