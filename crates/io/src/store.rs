use anyhow::{Context, Result};
use model::{DailyProgress, SessionSummary, UserProfile};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};
use uuid::Uuid;

pub const PROFILE_FILE: &str = "profile.json";
pub const PROGRESS_FILE: &str = "progress.json";
pub const HISTORY_FILE: &str = "history.json";
pub const ACHIEVEMENTS_FILE: &str = "achievements.json";

/// Where session history lives. Sessions are kept newest first.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<SessionSummary>>;
    fn save(&self, sessions: &[SessionSummary]) -> Result<()>;
}

pub struct JsonFileStore {
    doc: JsonDocument<Vec<SessionSummary>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { doc: JsonDocument::new(path) }
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Result<Vec<SessionSummary>> {
        self.doc.load()
    }

    fn save(&self, sessions: &[SessionSummary]) -> Result<()> {
        self.doc.save_slice(sessions)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<SessionSummary>>,
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.sessions.lock().clone())
    }

    fn save(&self, sessions: &[SessionSummary]) -> Result<()> {
        *self.sessions.lock() = sessions.to_vec();
        Ok(())
    }
}

/// In-memory history backed by a store; every change is written through.
pub struct SessionHistory {
    store: Box<dyn HistoryStore>,
    sessions: Vec<SessionSummary>,
}

impl SessionHistory {
    pub fn open(store: Box<dyn HistoryStore>) -> Result<Self> {
        let sessions = store.load()?;
        log::debug!("loaded {} sessions", sessions.len());
        Ok(Self { store, sessions })
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&SessionSummary> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn latest(&self) -> Option<&SessionSummary> {
        self.sessions.first()
    }

    pub fn add(&mut self, session: SessionSummary) -> Result<()> {
        let mut next = Vec::with_capacity(self.sessions.len() + 1);
        next.push(session);
        next.extend_from_slice(&self.sessions);
        self.commit(next)
    }

    /// Merge `incoming`, skipping ids already present. Returns how many
    /// were added.
    pub fn merge(&mut self, incoming: Vec<SessionSummary>) -> Result<usize> {
        let mut next = self.sessions.clone();
        for s in incoming {
            if !next.iter().any(|have| have.id == s.id) {
                next.push(s);
            }
        }
        let added = next.len() - self.sessions.len();
        if added > 0 {
            next.sort_by(|a, b| b.date.cmp(&a.date));
            self.commit(next)?;
        }
        Ok(added)
    }

    pub fn replace_all(&mut self, mut sessions: Vec<SessionSummary>) -> Result<()> {
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        self.commit(sessions)
    }

    /// Memory only changes once the store accepted the write.
    fn commit(&mut self, next: Vec<SessionSummary>) -> Result<()> {
        self.store.save(&next)?;
        self.sessions = next;
        Ok(())
    }
}

/// One JSON value in one file. A missing file reads as `T::default()`.
pub struct JsonDocument<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _marker: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write<V: Serialize + ?Sized>(&self, value: &V) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

impl<T: DeserializeOwned + Default> JsonDocument<T> {
    pub fn load(&self) -> Result<T> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).with_context(|| format!("parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }
}

impl<T: Serialize> JsonDocument<T> {
    pub fn save(&self, value: &T) -> Result<()> {
        self.write(value)
    }
}

impl<E: Serialize> JsonDocument<Vec<E>> {
    pub fn save_slice(&self, items: &[E]) -> Result<()> {
        self.write(items)
    }
}

/// Layout of the on-disk data directory.
#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document<T>(&self, file: &str) -> JsonDocument<T> {
        JsonDocument::new(self.root.join(file))
    }

    pub fn profile(&self) -> JsonDocument<UserProfile> {
        self.document(PROFILE_FILE)
    }

    pub fn progress(&self) -> JsonDocument<DailyProgress> {
        self.document(PROGRESS_FILE)
    }

    pub fn history(&self) -> Result<SessionHistory> {
        SessionHistory::open(Box::new(JsonFileStore::new(self.root.join(HISTORY_FILE))))
    }
}
