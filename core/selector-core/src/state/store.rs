//! Suspended-state persistence.
//!
//! Every [`StateStore::save`] mints a new token. Entries already in the store
//! are never rewritten, so re-suspending a flow leaves the previous token's
//! entry exactly as it was.
//!
//! # File Format
//!
//! [`FileStateStore`] keeps all entries in one JSON file:
//!
//! ```json
//! {
//!   "version": 1,
//!   "states": {
//!     "_3f9a...": { "stage": "...", "state": { ... }, "saved_at": "...", "expires_at": "..." }
//!   }
//! }
//! ```
//!
//! # Defensive Design
//!
//! The file may be written by several processes, so on read we handle:
//! - Missing or empty files (empty store)
//! - Corrupt JSON (empty store, log warning)
//! - Version mismatches (empty store)
//!
//! # Atomic Writes
//!
//! Saves hold an exclusive lock on a sidecar `<file>.lock` for the whole
//! read, prune, insert and persist cycle, so concurrent writers never drop
//! each other's entries. The file itself is replaced with temp file + rename,
//! so readers need no lock and never observe a partial write.

use fs_err as fs;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::token;
use super::types::{FlowState, Stage, SuspendedState, Token};

const STORE_VERSION: u32 = 1;

pub const DEFAULT_STATE_TTL_SECS: u64 = 3600;

/// Upper bound on entry lifetime (ten years).
const MAX_STATE_TTL_SECS: i64 = 10 * 365 * 24 * 3600;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist temp file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("State file path has no parent directory: {}", .0.display())]
    NoParentDir(PathBuf),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no suspended state for token")]
    NotFound,

    #[error("state belongs to stage '{found}', expected '{expected}'")]
    StageMismatch { expected: Stage, found: Stage },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Keyed storage for suspended flows.
pub trait StateStore {
    /// Integrity/format check applied before any load.
    fn validate(&self, raw: &str) -> bool {
        token::is_well_formed(raw)
    }

    /// Loads the entry for `token`, which must have been saved under `stage`.
    fn load(&self, token: &Token, stage: &Stage) -> Result<SuspendedState, LoadError>;

    /// Persists `state` under a fresh token and returns it.
    fn save(&mut self, state: &FlowState, stage: &Stage) -> Result<Token, StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    stage: Stage,
    state: FlowState,
    saved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn new(state: &FlowState, stage: &Stage, ttl: Duration) -> Self {
        let now = Utc::now();
        StoredEntry {
            stage: stage.clone(),
            state: state.clone(),
            saved_at: now,
            expires_at: now + ttl,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

fn ttl_from_secs(secs: u64) -> Duration {
    let secs = i64::try_from(secs).unwrap_or(MAX_STATE_TTL_SECS);
    Duration::seconds(secs.min(MAX_STATE_TTL_SECS))
}

fn resolve_entry(
    entry: Option<&StoredEntry>,
    token: &Token,
    stage: &Stage,
) -> Result<SuspendedState, LoadError> {
    let entry = entry.ok_or(LoadError::NotFound)?;

    if entry.is_expired(Utc::now()) {
        tracing::debug!(token = %token, expires_at = %entry.expires_at, "Suspended state expired");
        return Err(LoadError::NotFound);
    }

    if &entry.stage != stage {
        return Err(LoadError::StageMismatch {
            expected: stage.clone(),
            found: entry.stage.clone(),
        });
    }

    Ok(SuspendedState {
        token: token.clone(),
        stage: entry.stage.clone(),
        state: entry.state.clone(),
    })
}

/// Process-local store for tests and embedding callers.
pub struct MemoryStateStore {
    entries: HashMap<Token, StoredEntry>,
    ttl: Duration,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::with_ttl_secs(DEFAULT_STATE_TTL_SECS)
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        MemoryStateStore {
            entries: HashMap::new(),
            ttl: ttl_from_secs(ttl_secs),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, token: &Token, stage: &Stage) -> Result<SuspendedState, LoadError> {
        resolve_entry(self.entries.get(token), token, stage)
    }

    fn save(&mut self, state: &FlowState, stage: &Stage) -> Result<Token, StoreError> {
        let now = Utc::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let token = Token::generate();
        self.entries
            .insert(token.clone(), StoredEntry::new(state, stage, self.ttl));
        Ok(token)
    }
}

/// The on-disk JSON structure for the state file.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    /// Schema version. We only load files with version == 1.
    version: u32,
    states: HashMap<Token, StoredEntry>,
}

impl Default for StoreFile {
    fn default() -> Self {
        StoreFile {
            version: STORE_VERSION,
            states: HashMap::new(),
        }
    }
}

/// JSON-file-backed store. Each operation re-reads the file so that states
/// saved by other processes are visible.
pub struct FileStateStore {
    file_path: PathBuf,
    ttl: Duration,
}

impl FileStateStore {
    pub fn new(file_path: &Path, ttl_secs: u64) -> Self {
        FileStateStore {
            file_path: file_path.to_path_buf(),
            ttl: ttl_from_secs(ttl_secs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_file(&self) -> Result<StoreFile, StoreError> {
        if !self.file_path.exists() {
            return Ok(StoreFile::default());
        }

        let content = fs::read_to_string(&self.file_path)?;

        // Defensive: Handle empty file
        if content.trim().is_empty() {
            tracing::warn!("Empty state file, treating as empty store");
            return Ok(StoreFile::default());
        }

        match serde_json::from_str::<StoreFile>(&content) {
            Ok(store_file) if store_file.version == STORE_VERSION => Ok(store_file),
            Ok(store_file) => {
                tracing::warn!(
                    version = store_file.version,
                    "Unsupported state file version (expected 1), treating as empty store"
                );
                Ok(StoreFile::default())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to parse state file, treating as empty store"
                );
                Ok(StoreFile::default())
            }
        }
    }

    fn parent_dir(&self) -> Result<&Path, StoreError> {
        self.file_path
            .parent()
            .ok_or_else(|| StoreError::NoParentDir(self.file_path.clone()))
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.file_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Blocks until this process holds the writer lock. Released when the
    /// returned file is dropped.
    fn lock_for_write(&self) -> Result<fs::File, StoreError> {
        fs::create_dir_all(self.parent_dir()?)?;
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        // Explicit call avoids the std `File::lock` methods on newer toolchains
        FileExt::lock_exclusive(lock_file.file())?;
        Ok(lock_file)
    }

    fn write_file(&self, store_file: &StoreFile) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(store_file)?;
        let parent_dir = self.parent_dir()?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(&self.file_path)?;

        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self, token: &Token, stage: &Stage) -> Result<SuspendedState, LoadError> {
        let store_file = self.read_file()?;
        resolve_entry(store_file.states.get(token), token, stage)
    }

    fn save(&mut self, state: &FlowState, stage: &Stage) -> Result<Token, StoreError> {
        let _lock = self.lock_for_write()?;
        let mut store_file = self.read_file()?;

        let now = Utc::now();
        let before = store_file.states.len();
        store_file.states.retain(|_, entry| !entry.is_expired(now));
        let pruned = before - store_file.states.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired suspended states");
        }

        let token = Token::generate();
        store_file
            .states
            .insert(token.clone(), StoredEntry::new(state, stage, self.ttl));
        self.write_file(&store_file)?;

        Ok(token)
    }
}
