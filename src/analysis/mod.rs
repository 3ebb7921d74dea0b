//! Aggregation over normalized organizations.
//!
//! Everything here is pure and total: an empty collection yields zeroed
//! output rather than an error.
//!
//! Submodules:
//! - `stats`  — the `EcosystemStats` aggregate (counts, sums, averages).
//! - `charts` — presentation series derived from the aggregate
//!   (distributions, top sectors, founding trend, currency labels).

pub mod charts;
pub mod stats;
