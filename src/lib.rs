//! Tracks how a day is split between a fixed set of life activities and compares it with a healthy
//! balance. Sessions are started and stopped from the terminal, then aggregated per day, week or
//! month into recommendations and a productivity score.

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod fs;
pub mod storage;
pub mod tracking;
pub mod utils;
