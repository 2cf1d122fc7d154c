//! Storage is organized through [SessionStore].
//! The basic idea is:
//!   - Sessions of a user are stored in insertion order, which is also start time order.
//!   - A user has at most one active session and it's always the newest one.
//!   - Writes are conditional, so two processes racing on the same user can't both succeed in
//!     creating an active session.

pub mod file_store;
pub mod memory_store;

use std::ops::Deref;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::tracking::session::{NewSession, Session, SessionId, UserId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("User {user_id} already has active session {session_id}")]
    ActiveSessionExists {
        user_id: UserId,
        session_id: SessionId,
    },

    #[error("Session {session_id} of user {user_id} is no longer the active session")]
    Conflict {
        user_id: UserId,
        session_id: SessionId,
    },
}

/// Persistence collaborator of the tracker. Implementations must make every write durable before
/// returning and must reject writes that would break the single active session rule.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Saves a new active session and returns it with its assigned id.
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Replaces the active session of `session.user_id` with `session`.
    async fn update_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Replaces the active session with its stopped version `stopped` and saves `next` as the new
    /// active session. Either both writes happen or none.
    async fn switch_session(
        &self,
        stopped: &Session,
        next: NewSession,
    ) -> Result<Session, StoreError>;

    async fn active_session_for(&self, user_id: UserId) -> Result<Option<Session>, StoreError>;

    /// Sessions whose `session_date` is between `start` and `end` (both inclusive), ordered by
    /// start time.
    async fn sessions_in_range(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, StoreError>;
}

#[async_trait]
impl<T> SessionStore for T
where
    T: Deref + Send + Sync,
    T::Target: SessionStore,
{
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        self.deref().insert_session(session).await
    }

    async fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        self.deref().update_session(session).await
    }

    async fn switch_session(
        &self,
        stopped: &Session,
        next: NewSession,
    ) -> Result<Session, StoreError> {
        self.deref().switch_session(stopped, next).await
    }

    async fn active_session_for(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        self.deref().active_session_for(user_id).await
    }

    async fn sessions_in_range(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, StoreError> {
        self.deref().sessions_in_range(user_id, start, end).await
    }
}
