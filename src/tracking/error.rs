use chrono::NaiveDateTime;
use thiserror::Error;

use crate::storage::StoreError;

use super::session::UserId;

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Unknown activity category: {0:?}")]
    InvalidCategory(String),

    #[error("User {0} has no active session")]
    NoActiveSession(UserId),

    #[error("Stop time {end} precedes start time {start}")]
    ClockSkew {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
