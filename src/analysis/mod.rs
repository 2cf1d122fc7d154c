//! Turning recorded sessions into per-day usage, range totals, comparisons with the catalog and
//! recommendations.

pub mod aggregation;
pub mod recommendation;
pub mod summary;
