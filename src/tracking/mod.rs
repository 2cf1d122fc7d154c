//! Start/stop tracking of activities. [SessionTracker] turns requests of a user into session
//! records and makes sure a user never has more than one session running.

pub mod error;
pub mod session;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::{catalog::ActivityCategory, storage::SessionStore, utils::locks::KeyedLocks};

use error::TrackingError;
use session::{NewSession, Session, UserId};

pub struct SessionTracker<S> {
    store: S,
    /// Start and stop of the same user must not interleave, otherwise two requests could both see
    /// no active session and both create one.
    user_locks: KeyedLocks<UserId, Mutex<()>>,
}

impl<S: SessionStore> SessionTracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            user_locks: KeyedLocks::new(),
        }
    }

    /// Starts tracking `category` for the user. The category is validated against
    /// [ActivityCategory].
    pub async fn start(
        &self,
        user_id: UserId,
        category: &str,
        now: NaiveDateTime,
    ) -> Result<Session, TrackingError> {
        let category = category.parse::<ActivityCategory>()?;
        self.start_activity(user_id, category, now).await
    }

    /// Starts tracking `category`. If something is already running it's stopped at `now` first,
    /// the same way [SessionTracker::stop] would do it. Stopping the previous session and saving
    /// the new one is a single store write, so a failure leaves the previous session running.
    #[instrument(skip(self))]
    pub async fn start_activity(
        &self,
        user_id: UserId,
        category: ActivityCategory,
        now: NaiveDateTime,
    ) -> Result<Session, TrackingError> {
        let lock = self.user_locks.acquire(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.start_locked(user_id, category, now).await
        };
        self.user_locks.release(user_id, lock);
        result
    }

    async fn start_locked(
        &self,
        user_id: UserId,
        category: ActivityCategory,
        now: NaiveDateTime,
    ) -> Result<Session, TrackingError> {
        let next = NewSession::new(user_id, category, now);
        let session = match self.store.active_session_for(user_id).await? {
            Some(mut previous) => {
                debug!("Stopping session {} before starting {category}", previous.id);
                previous.stop(now)?;
                let session = self.store.switch_session(&previous, next).await?;
                log_stopped(&previous);
                session
            }
            None => self.store.insert_session(next).await?,
        };
        info!(
            "Started session {} ({category}) for user {user_id}",
            session.id
        );
        Ok(session)
    }

    /// Stops the running session of the user at `now`.
    #[instrument(skip(self))]
    pub async fn stop(
        &self,
        user_id: UserId,
        now: NaiveDateTime,
    ) -> Result<Session, TrackingError> {
        let lock = self.user_locks.acquire(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.stop_locked(user_id, now).await
        };
        self.user_locks.release(user_id, lock);
        result
    }

    async fn stop_locked(
        &self,
        user_id: UserId,
        now: NaiveDateTime,
    ) -> Result<Session, TrackingError> {
        let mut session = self
            .store
            .active_session_for(user_id)
            .await?
            .ok_or(TrackingError::NoActiveSession(user_id))?;
        session.stop(now)?;
        self.store.update_session(&session).await?;
        log_stopped(&session);
        Ok(session)
    }

    /// Returns the running session of the user, if there is one. Only fails if the store can't be
    /// read.
    pub async fn active_session(&self, user_id: UserId) -> Result<Option<Session>, TrackingError> {
        Ok(self.store.active_session_for(user_id).await?)
    }
}

fn log_stopped(session: &Session) {
    info!(
        "Stopped session {} ({}) for user {} after {} minutes",
        session.id, session.category, session.user_id, session.duration_minutes
    );
}
