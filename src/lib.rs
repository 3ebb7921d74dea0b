//! Startup-ecosystem directory service.
//!
//! Reads company records from a hosted PostgREST backend (or an offline
//! fixture), flattens each joined row into a normalized `Organization`,
//! aggregates ecosystem statistics, and keeps the result fresh from a
//! PostgreSQL change feed.

pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod realtime;
pub mod tables;
pub mod verify;
