// ABOUTME: Session persistence so a live session survives application restarts
// Saves the current session record and restores it when the manager is constructed

use super::error::StoreError;
use crate::models::Session;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

const SESSION_FILE_NAME: &str = "session.json";

/// Storage for the single current session record.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if one was saved.
    fn load(&self) -> Result<Option<Session>, StoreError>;

    /// Replace the persisted session.
    fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Forget the persisted session.
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON file store under the user's home directory.
pub struct FileSessionStore {
    storage_path: PathBuf,
}

impl FileSessionStore {
    /// Store under `~/.session-box`.
    pub fn new() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::NoStorageDir)?;
        Self::in_dir(home.join(".session-box"))
    }

    /// Store under an explicit directory, creating it if needed.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let storage_path = dir.into();

        // Ensure directory exists
        fs::create_dir_all(&storage_path)?;

        Ok(Self { storage_path })
    }

    fn session_file(&self) -> PathBuf {
        self.storage_path.join(SESSION_FILE_NAME)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, StoreError> {
        let session_file = self.session_file();
        if !session_file.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&session_file)?;
        if content.trim().is_empty() {
            warn!("Session file {:?} is empty, ignoring", session_file);
            return Ok(None);
        }

        let session = serde_json::from_str::<Session>(&content)?;
        debug!("Loaded session {} from {:?}", session.session_id, session_file);
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(session)?;

        // Write to a sibling temp file and rename so a crash never leaves a torn record
        let mut tmp = tempfile::NamedTempFile::new_in(&self.storage_path)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.session_file()).map_err(|e| e.error)?;

        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let session_file = self.session_file();
        if session_file.exists() {
            fs::remove_file(session_file)?;
        }
        Ok(())
    }
}

/// Process-local store; counts writes so callers can observe persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    session: Option<Session>,
    writes: usize,
}

impl MemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                session: Some(session),
                writes: 0,
            }),
        }
    }

    /// The currently stored record.
    pub fn snapshot(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Number of `save` and `clear` calls made so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.lock().session.clone())
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.session = Some(session.clone());
        inner.writes += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.session = None;
        inner.writes += 1;
        Ok(())
    }
}
