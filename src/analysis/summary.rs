use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    storage::SessionStore,
    tracking::{
        error::TrackingError,
        session::{Session, UserId},
    },
};

use super::{
    aggregation::{daily_usage, range_totals, DailyUsage, DateSpan, RangeTotals},
    recommendation::{compare_all, generate, productivity_score, Comparison, Recommendation},
};

/// Everything there is to know about a single day of a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub usage: DailyUsage,
    /// Catalog order.
    pub comparisons: Vec<Comparison>,
    /// Generation order. Use [sort_by_priority](super::recommendation::sort_by_priority) for
    /// display.
    pub recommendations: Vec<Recommendation>,
    pub score: u32,
    pub total_minutes: u32,
}

impl DailySummary {
    pub fn build(user_id: UserId, date: NaiveDate, usage: DailyUsage) -> Self {
        Self {
            user_id,
            date,
            comparisons: compare_all(&usage),
            recommendations: generate(user_id, &usage, date),
            score: productivity_score(&usage),
            total_minutes: usage.total_minutes(),
            usage,
        }
    }
}

/// Reads sessions of a user out of the store and runs them through aggregation and
/// recommendations. Every call reads a fresh snapshot, nothing is cached.
pub struct Coach<S> {
    store: S,
}

impl<S: SessionStore> Coach<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn daily_summary(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<DailySummary, TrackingError> {
        let sessions = self.store.sessions_in_range(user_id, date, date).await?;
        debug!("Summarizing {} sessions", sessions.len());
        Ok(DailySummary::build(
            user_id,
            date,
            daily_usage(&sessions, date),
        ))
    }

    #[instrument(skip(self))]
    pub async fn range_summary(
        &self,
        user_id: UserId,
        span: DateSpan,
    ) -> Result<RangeTotals, TrackingError> {
        let sessions = self.sessions_of(user_id, span).await?;
        debug!("Summarizing {} sessions", sessions.len());
        Ok(range_totals(&sessions, span.start, span.end))
    }

    /// Completed sessions of the span ordered by start time. Running sessions are left out the same
    /// way aggregation leaves them out.
    pub async fn sessions(
        &self,
        user_id: UserId,
        span: DateSpan,
    ) -> Result<Vec<Session>, TrackingError> {
        let mut sessions = self.sessions_of(user_id, span).await?;
        sessions.retain(Session::is_completed);
        Ok(sessions)
    }

    async fn sessions_of(
        &self,
        user_id: UserId,
        span: DateSpan,
    ) -> Result<Vec<Session>, TrackingError> {
        if span.days() == 0 {
            return Ok(vec![]);
        }
        Ok(self
            .store
            .sessions_in_range(user_id, span.start, span.end)
            .await?)
    }
}
