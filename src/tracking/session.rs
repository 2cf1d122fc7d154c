use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::catalog::ActivityCategory;

use super::error::TrackingError;

pub type UserId = u64;
pub type SessionId = u64;

/// A session that hasn't been given an id by the store yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user_id: UserId,
    pub category: ActivityCategory,
    pub start_time: NaiveDateTime,
}

impl NewSession {
    pub fn new(user_id: UserId, category: ActivityCategory, start_time: NaiveDateTime) -> Self {
        Self {
            user_id,
            category,
            start_time,
        }
    }

    pub fn into_session(self, id: SessionId) -> Session {
        Session {
            id,
            user_id: self.user_id,
            category: self.category,
            start_time: self.start_time,
            end_time: None,
            duration_minutes: 0,
            session_date: self.start_time.date(),
            active: true,
        }
    }
}

/// One timed interval of a user doing a single activity. Times are wall-clock times of the user,
/// so `session_date` is the calendar day the user saw when the session started.
///
/// A session is created active and is stopped exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub category: ActivityCategory,
    pub start_time: NaiveDateTime,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub duration_minutes: u32,
    pub session_date: NaiveDate,
    pub active: bool,
}

impl Session {
    /// Finishes the session at `end`. Duration is the number of whole minutes elapsed.
    pub fn stop(&mut self, end: NaiveDateTime) -> Result<(), TrackingError> {
        if end < self.start_time {
            return Err(TrackingError::ClockSkew {
                start: self.start_time,
                end,
            });
        }
        let minutes = (end - self.start_time).num_minutes();
        self.end_time = Some(end);
        self.duration_minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
        self.active = false;
        Ok(())
    }

    /// Only finished sessions with some recorded time count towards usage.
    pub fn is_completed(&self) -> bool {
        !self.active && self.duration_minutes > 0
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes as f64 / 60.
    }

    pub fn tracking_status(&self) -> String {
        if self.active {
            format!(
                "Active - {} (started at {})",
                self.category,
                self.start_time.format("%H:%M")
            )
        } else {
            format!(
                "Completed - {} ({} minutes)",
                self.category, self.duration_minutes
            )
        }
    }
}
