use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::tracking::session::{NewSession, Session, UserId};

use super::{SessionStore, StoreError};

/// Keeps sessions in memory. Follows the same write rules as
/// [FileSessionStore](super::file_store::FileSessionStore), which makes it a drop-in replacement
/// when nothing has to survive the process.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<UserId, Vec<Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<UserId, Vec<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stored version of the active session `expected` refers to.
fn current_mut<'a>(
    sessions: &'a mut HashMap<UserId, Vec<Session>>,
    expected: &Session,
) -> Result<&'a mut Session, StoreError> {
    sessions
        .get_mut(&expected.user_id)
        .and_then(|v| v.iter_mut().find(|v| v.active && v.id == expected.id))
        .ok_or(StoreError::Conflict {
            user_id: expected.user_id,
            session_id: expected.id,
        })
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut sessions = self.sessions();
        let user_sessions = sessions.entry(session.user_id).or_default();

        if let Some(active) = user_sessions.iter().find(|v| v.active) {
            return Err(StoreError::ActiveSessionExists {
                user_id: active.user_id,
                session_id: active.id,
            });
        }

        let id = user_sessions.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        let session = session.into_session(id);
        user_sessions.push(session.clone());
        Ok(session)
    }

    async fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions();
        let current = current_mut(&mut sessions, session)?;
        *current = session.clone();
        Ok(())
    }

    async fn switch_session(
        &self,
        stopped: &Session,
        next: NewSession,
    ) -> Result<Session, StoreError> {
        let mut sessions = self.sessions();
        *current_mut(&mut sessions, stopped)? = stopped.clone();

        let user_sessions = sessions.entry(stopped.user_id).or_default();
        let id = user_sessions.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        let session = next.into_session(id);
        user_sessions.push(session.clone());
        Ok(session)
    }

    async fn active_session_for(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions()
            .get(&user_id)
            .and_then(|v| v.iter().find(|v| v.active).cloned()))
    }

    async fn sessions_in_range(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sessions = self
            .sessions()
            .get(&user_id)
            .map(|v| {
                v.iter()
                    .filter(|v| start <= v.session_date && v.session_date <= end)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        sessions.sort_by_key(|v| v.start_time);
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use crate::{
        catalog::ActivityCategory,
        storage::{SessionStore, StoreError},
        tracking::session::NewSession,
    };

    use super::MemorySessionStore;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_conditional_writes() -> Result<()> {
        let store = MemorySessionStore::new();

        let mut session = store
            .insert_session(NewSession::new(1, ActivityCategory::Sport, at(9, 0)))
            .await?;
        assert!(matches!(
            store
                .insert_session(NewSession::new(1, ActivityCategory::Sleep, at(9, 1)))
                .await,
            Err(StoreError::ActiveSessionExists { .. })
        ));

        session.stop(at(10, 0))?;
        store.update_session(&session).await?;
        assert!(matches!(
            store.update_session(&session).await,
            Err(StoreError::Conflict { .. })
        ));

        let next = store
            .insert_session(NewSession::new(1, ActivityCategory::Sleep, at(10, 0)))
            .await?;
        assert_eq!(next.id, 2);
        assert_eq!(store.active_session_for(1).await?, Some(next));
        Ok(())
    }

    #[tokio::test]
    async fn test_switch_session() -> Result<()> {
        let store = MemorySessionStore::new();

        let active = store
            .insert_session(NewSession::new(1, ActivityCategory::Sport, at(9, 0)))
            .await?;
        let mut stopped = active.clone();
        stopped.stop(at(10, 0))?;

        let next = store
            .switch_session(&stopped, NewSession::new(1, ActivityCategory::Academic, at(10, 0)))
            .await?;
        assert_eq!(next.id, 2);
        assert_eq!(store.active_session_for(1).await?, Some(next.clone()));

        // The previous session is no longer active, so switching away from it again is stale.
        let result = store
            .switch_session(&stopped, NewSession::new(1, ActivityCategory::Sleep, at(10, 5)))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Conflict {
                user_id: 1,
                session_id: 1
            })
        ));

        let day = at(0, 0).date();
        assert_eq!(store.sessions_in_range(1, day, day).await?, vec![stopped, next]);
        Ok(())
    }
}
