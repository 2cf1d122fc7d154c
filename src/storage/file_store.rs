use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncSeekExt, BufReader},
    sync::RwLock,
};
use tracing::{debug, warn};

use crate::{
    fs::operations::{
        append_line, lock_file, read_last_line, replace_last_line, LockMode, LOCK_TIMEOUT,
    },
    tracking::session::{NewSession, Session, UserId},
    utils::locks::KeyedLocks,
};

use super::{SessionStore, StoreError};

/// Keeps the sessions of every user in a separate JSON-lines file. Sessions are only ever appended,
/// except for the last line which gets overwritten when the active session is stopped.
///
/// Files are locked for the duration of each operation, so multiple processes can share the same
/// directory. Tasks of this process first queue on an in-memory lock of the file and only then take
/// the file lock, which is polled so a busy file never stalls the runtime.
pub struct FileSessionStore {
    session_dir: PathBuf,
    file_locks: KeyedLocks<UserId, RwLock<()>>,
}

impl FileSessionStore {
    pub fn new(session_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&session_dir)?;

        Ok(Self {
            session_dir,
            file_locks: KeyedLocks::new(),
        })
    }

    fn user_file(&self, user_id: UserId) -> PathBuf {
        self.session_dir.join(format!("user-{user_id}.jsonl"))
    }

    async fn open_for_write(&self, user_id: UserId) -> Result<File, std::io::Error> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.user_file(user_id))
            .await
    }

    /// Reads every session of a user. A missing file means the user has no sessions yet.
    async fn read_all(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let lock = self.file_locks.acquire(user_id);
        let result = {
            let _guard = lock.read().await;
            self.read_all_guarded(user_id).await
        };
        self.file_locks.release(user_id, lock);
        result
    }

    async fn read_all_guarded(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let path = self.user_file(user_id);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        lock_file(&file, LockMode::Shared, LOCK_TIMEOUT).await?;
        let result = read_sessions(&mut file, &path).await;
        file.unlock_async().await?;
        result
    }

    /// Opens the file of `user_id` and locks it exclusively. The caller has to hold the in-process
    /// write lock of the user and unlock the file once done.
    async fn open_exclusive(&self, user_id: UserId) -> Result<(File, PathBuf), StoreError> {
        let file = self.open_for_write(user_id).await?;
        // Semi-safe acquire-release for a file
        lock_file(&file, LockMode::Exclusive, LOCK_TIMEOUT).await?;
        Ok((file, self.user_file(user_id)))
    }

    async fn insert_guarded(
        &self,
        lock: &RwLock<()>,
        session: NewSession,
    ) -> Result<Session, StoreError> {
        let _guard = lock.write().await;
        let (mut file, path) = self.open_exclusive(session.user_id).await?;
        let result = insert_locked(&mut file, &path, session).await;
        file.unlock_async().await?;
        result
    }

    async fn update_guarded(&self, lock: &RwLock<()>, session: &Session) -> Result<(), StoreError> {
        let _guard = lock.write().await;
        let (mut file, _) = self.open_exclusive(session.user_id).await?;
        let result = update_locked(&mut file, session).await;
        file.unlock_async().await?;
        result
    }

    async fn switch_guarded(
        &self,
        lock: &RwLock<()>,
        stopped: &Session,
        next: NewSession,
    ) -> Result<Session, StoreError> {
        let _guard = lock.write().await;
        let (mut file, path) = self.open_exclusive(stopped.user_id).await?;
        let result = switch_locked(&mut file, &path, stopped, next).await;
        file.unlock_async().await?;
        result
    }
}

/// The active session is always the last line. Anything else there means `expected` is stale.
async fn ensure_current(file: &mut File, expected: &Session) -> Result<(), StoreError> {
    let last_line = read_last_line(file).await?;
    let is_current = serde_json::from_str::<Session>(&last_line)
        .map(|last| last.id == expected.id && last.active)
        .unwrap_or(false);
    if !is_current {
        return Err(StoreError::Conflict {
            user_id: expected.user_id,
            session_id: expected.id,
        });
    }
    Ok(())
}

fn next_id(existing: &[Session]) -> u64 {
    existing.iter().map(|v| v.id).max().unwrap_or(0) + 1
}

async fn insert_locked(
    file: &mut File,
    path: &Path,
    session: NewSession,
) -> Result<Session, StoreError> {
    let existing = read_sessions(file, path).await?;
    if let Some(active) = existing.iter().find(|v| v.active) {
        return Err(StoreError::ActiveSessionExists {
            user_id: active.user_id,
            session_id: active.id,
        });
    }

    let session = session.into_session(next_id(&existing));
    let line = serde_json::to_string(&session)?;

    let last_line = read_last_line(file).await?;
    if !last_line.is_empty() && serde_json::from_str::<Session>(&last_line).is_err() {
        // Might happen when a previous write was cut off by a shutdown.
        warn!("Overwriting corrupted last line in {path:?}: {last_line}");
        replace_last_line(file, &line).await?;
    } else {
        append_line(file, &line).await?;
    }
    Ok(session)
}

async fn update_locked(file: &mut File, session: &Session) -> Result<(), StoreError> {
    ensure_current(file, session).await?;
    replace_last_line(file, &serde_json::to_string(session)?).await?;
    Ok(())
}

async fn switch_locked(
    file: &mut File,
    path: &Path,
    stopped: &Session,
    next: NewSession,
) -> Result<Session, StoreError> {
    ensure_current(file, stopped).await?;
    let existing = read_sessions(file, path).await?;

    let session = next.into_session(next_id(&existing));
    // Both lines go out in a single write.
    let lines = format!(
        "{}\n{}",
        serde_json::to_string(stopped)?,
        serde_json::to_string(&session)?
    );
    replace_last_line(file, &lines).await?;
    Ok(session)
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let user_id = session.user_id;
        let lock = self.file_locks.acquire(user_id);
        let result = self.insert_guarded(&lock, session).await;
        self.file_locks.release(user_id, lock);

        let session = result?;
        debug!("Inserted session {} for user {user_id}", session.id);
        Ok(session)
    }

    async fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let lock = self.file_locks.acquire(session.user_id);
        let result = self.update_guarded(&lock, session).await;
        self.file_locks.release(session.user_id, lock);
        result
    }

    async fn switch_session(
        &self,
        stopped: &Session,
        next: NewSession,
    ) -> Result<Session, StoreError> {
        let lock = self.file_locks.acquire(stopped.user_id);
        let result = self.switch_guarded(&lock, stopped, next).await;
        self.file_locks.release(stopped.user_id, lock);

        let session = result?;
        debug!(
            "Replaced session {} with {} for user {}",
            stopped.id, session.id, stopped.user_id
        );
        Ok(session)
    }

    async fn active_session_for(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        let sessions = self.read_all(user_id).await?;
        Ok(sessions.into_iter().rev().find(|v| v.active))
    }

    async fn sessions_in_range(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sessions = self
            .read_all(user_id)
            .await?
            .into_iter()
            .filter(|v| start <= v.session_date && v.session_date <= end)
            .collect::<Vec<_>>();
        sessions.sort_by_key(|v| v.start_time);
        Ok(sessions)
    }
}

async fn read_sessions(file: &mut File, path: &Path) -> Result<Vec<Session>, StoreError> {
    file.rewind().await?;
    let mut lines = BufReader::new(&mut *file).lines();
    let mut sessions = vec![];
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Session>(&line) {
            Ok(v) => sessions.push(v),
            Err(e) => {
                // ignore illegal values. Might happen after shutdowns
                warn!("During parsing in path {path:?} found illegal json string {line}: {e}")
            }
        }
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::Write,
        sync::{mpsc, Arc},
        time::Duration,
    };

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
    use futures::future::join_all;
    use tempfile::tempdir;

    use crate::{
        catalog::ActivityCategory,
        storage::{SessionStore, StoreError},
        tracking::session::NewSession,
    };

    use super::FileSessionStore;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        let mut first = store
            .insert_session(NewSession::new(1, ActivityCategory::Sport, at(15, 9, 0)))
            .await?;
        assert_eq!(first.id, 1);
        first.stop(at(15, 10, 0))?;
        store.update_session(&first).await?;

        let second = store
            .insert_session(NewSession::new(1, ActivityCategory::Sleep, at(15, 22, 0)))
            .await?;
        assert_eq!(second.id, 2);

        let other_user = store
            .insert_session(NewSession::new(2, ActivityCategory::Sleep, at(15, 22, 0)))
            .await?;
        assert_eq!(other_user.id, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_active_session_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        store
            .insert_session(NewSession::new(1, ActivityCategory::Sport, at(15, 9, 0)))
            .await?;
        let result = store
            .insert_session(NewSession::new(1, ActivityCategory::Academic, at(15, 9, 5)))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ActiveSessionExists {
                user_id: 1,
                session_id: 1
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_persists_stopped_session() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        let mut session = store
            .insert_session(NewSession::new(1, ActivityCategory::Academic, at(15, 9, 0)))
            .await?;
        assert_eq!(store.active_session_for(1).await?, Some(session.clone()));

        session.stop(at(15, 11, 30))?;
        store.update_session(&session).await?;

        assert_eq!(store.active_session_for(1).await?, None);
        let stored = store
            .sessions_in_range(1, at(15, 0, 0).date(), at(15, 0, 0).date())
            .await?;
        assert_eq!(stored, vec![session]);
        assert_eq!(stored[0].duration_minutes, 150);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        let session = store
            .insert_session(NewSession::new(1, ActivityCategory::Academic, at(15, 9, 0)))
            .await?;
        let mut first_stop = session.clone();
        first_stop.stop(at(15, 10, 0))?;
        store.update_session(&first_stop).await?;

        let mut second_stop = session;
        second_stop.stop(at(15, 10, 1))?;
        let result = store.update_session(&second_stop).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_sorted() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        for (day, category) in [
            (14, ActivityCategory::Sport),
            (15, ActivityCategory::Academic),
            (16, ActivityCategory::Sleep),
            (17, ActivityCategory::Entertainment),
        ] {
            let mut session = store
                .insert_session(NewSession::new(1, category, at(day, 8, 0)))
                .await?;
            session.stop(at(day, 9, 0))?;
            store.update_session(&session).await?;
        }

        let sessions = store
            .sessions_in_range(1, at(15, 0, 0).date(), at(16, 0, 0).date())
            .await?;
        let categories = sessions.iter().map(|v| v.category).collect::<Vec<_>>();
        assert_eq!(
            categories,
            vec![ActivityCategory::Academic, ActivityCategory::Sleep]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_user_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        assert_eq!(store.active_session_for(42).await?, None);
        assert!(store
            .sessions_in_range(42, at(1, 0, 0).date(), at(31, 0, 0).date())
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_last_line_is_replaced() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        let mut session = store
            .insert_session(NewSession::new(1, ActivityCategory::Sport, at(15, 9, 0)))
            .await?;
        session.stop(at(15, 10, 0))?;
        store.update_session(&session).await?;

        // Simulates a write cut off in the middle of a line.
        let path = dir.path().join("user-1.jsonl");
        let mut file = fs::OpenOptions::new().append(true).open(&path)?;
        file.write_all(b"{\"id\":2,\"user_id\":1,\"categ")?;
        drop(file);

        let next = store
            .insert_session(NewSession::new(1, ActivityCategory::Sleep, at(15, 22, 0)))
            .await?;
        assert_eq!(next.id, 2);

        let content = fs::read_to_string(&path)?;
        assert_eq!(content.lines().count(), 2);
        let sessions = store
            .sessions_in_range(1, at(15, 0, 0).date(), at(15, 0, 0).date())
            .await?;
        assert_eq!(sessions, vec![session, next]);
        Ok(())
    }

    #[tokio::test]
    async fn test_switch_session_replaces_active_line() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSessionStore::new(dir.path().to_owned())?;

        let active = store
            .insert_session(NewSession::new(1, ActivityCategory::Sport, at(15, 9, 0)))
            .await?;
        let mut stopped = active.clone();
        stopped.stop(at(15, 10, 0))?;

        let next = store
            .switch_session(
                &stopped,
                NewSession::new(1, ActivityCategory::Academic, at(15, 10, 0)),
            )
            .await?;
        assert_eq!(next.id, 2);
        assert_eq!(store.active_session_for(1).await?, Some(next.clone()));

        let path = dir.path().join("user-1.jsonl");
        let before = fs::read_to_string(&path)?;
        assert_eq!(before.lines().count(), 2);

        // Session 1 was already stopped, so nothing may be written.
        let result = store
            .switch_session(
                &stopped,
                NewSession::new(1, ActivityCategory::Sleep, at(15, 11, 0)),
            )
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Conflict {
                user_id: 1,
                session_id: 1
            })
        ));
        assert_eq!(fs::read_to_string(&path)?, before);

        let sessions = store
            .sessions_in_range(1, at(15, 0, 0).date(), at(15, 0, 0).date())
            .await?;
        assert_eq!(sessions, vec![stopped, next]);
        Ok(())
    }

    async fn read_while_writing(
        writer: Arc<FileSessionStore>,
        reader: Arc<FileSessionStore>,
    ) -> Result<()> {
        let day = at(15, 0, 0).date();
        let mut tasks = vec![];
        for i in 0..200 {
            let writer = writer.clone();
            tasks.push(tokio::spawn(async move {
                let start = at(15, 6, 0) + TimeDelta::minutes(i);
                let new = NewSession::new(1, ActivityCategory::Sport, start);
                match writer.insert_session(new).await {
                    Ok(mut session) => {
                        session.stop(start + TimeDelta::minutes(1))?;
                        writer.update_session(&session).await?;
                    }
                    Err(StoreError::ActiveSessionExists { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
                Ok::<_, anyhow::Error>(())
            }));

            let reader = reader.clone();
            tasks.push(tokio::spawn(async move {
                reader.sessions_in_range(1, day, day).await?;
                reader.active_session_for(1).await?;
                Ok(())
            }));
        }
        for task in join_all(tasks).await {
            task??;
        }

        let sessions = reader.sessions_in_range(1, day, day).await?;
        assert!(!sessions.is_empty());
        assert!(sessions.iter().all(|v| !v.active && v.end_time.is_some()));
        Ok(())
    }

    #[test]
    fn test_concurrent_reads_and_writes_on_current_thread() -> Result<()> {
        let dir = tempdir()?;
        // Two instances over one directory also contend on the file lock itself.
        let writer = Arc::new(FileSessionStore::new(dir.path().to_owned())?);
        let reader = Arc::new(FileSessionStore::new(dir.path().to_owned())?);

        let (done, finished) = mpsc::channel();
        std::thread::spawn(move || {
            let result = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(anyhow::Error::from)
                .and_then(|runtime| runtime.block_on(read_while_writing(writer, reader)));
            let _ = done.send(result);
        });

        finished.recv_timeout(Duration::from_secs(30))??;
        Ok(())
    }
}
