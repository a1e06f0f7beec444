//! Per-user rolling conversation window, persisted as one JSON file.
//!
//! The file maps user ids to `{"username", "messages": [{"role", "content"}]}`
//! and is rewritten wholesale after every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parley_llm::{Role, Turn, TurnContent};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{MemoryError, MemoryResult};

/// Default number of turns kept per user.
pub const DEFAULT_MAX_TURNS: usize = 6;

/// One user's conversation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Display name captured when the record was created.
    #[serde(rename = "username")]
    pub display_name: String,
    /// Turns, oldest first.
    #[serde(rename = "messages", default)]
    pub turns: Vec<Turn>,
}

impl ConversationRecord {
    fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_owned(),
            turns: Vec::new(),
        }
    }
}

/// Prefix user content with `"{display_name}: "` unless already prefixed.
#[must_use]
pub fn normalize_user_content(display_name: &str, content: &str) -> String {
    let prefix = format!("{display_name}: ");
    if content.starts_with(&prefix) {
        content.to_owned()
    } else {
        format!("{prefix}{content}")
    }
}

/// Rolling conversation windows keyed by user id.
pub struct ConversationStore {
    path: PathBuf,
    max_turns: usize,
    records: DashMap<String, ConversationRecord>,
    // Serialises append-trim-persist per user.
    user_locks: DashMap<String, Arc<Mutex<()>>>,
    // Orders whole-file writes.
    writer: Mutex<()>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("path", &self.path)
            .field("max_turns", &self.max_turns)
            .field("users", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl ConversationStore {
    /// Open the store at `path`.
    ///
    /// A missing or malformed file starts an empty store and the file is
    /// (re)written. Records longer than `max_turns` are trimmed on load.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Load`] if the file exists but cannot be read,
    /// and [`MemoryError::Persist`] if a fresh file cannot be written.
    pub fn open(path: impl Into<PathBuf>, max_turns: usize) -> MemoryResult<Self> {
        let path = path.into();
        let max_turns = max_turns.max(1);

        let loaded = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, ConversationRecord>>(&text) {
                Ok(records) => Some(records),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "conversation file is malformed, starting empty");
                    None
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no conversation file, starting empty");
                None
            },
            Err(e) => {
                return Err(MemoryError::Load {
                    path: path.display().to_string(),
                    source: e,
                });
            },
        };

        let store = Self {
            path,
            max_turns,
            records: DashMap::new(),
            user_locks: DashMap::new(),
            writer: Mutex::new(()),
        };

        match loaded {
            Some(records) => {
                for (user_id, mut record) in records {
                    trim_front(&mut record.turns, max_turns);
                    store.records.insert(user_id, record);
                }
                info!(
                    path = %store.path.display(),
                    users = store.records.len(),
                    "loaded conversation store"
                );
            },
            None => store.write_file_blocking()?,
        }

        Ok(store)
    }

    /// File the store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turns kept per user.
    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Append one turn, trim the window from the front, and persist.
    ///
    /// User turns are prefixed with the display name (see
    /// [`normalize_user_content`]); assistant and system turns are stored
    /// verbatim. The display name is captured the first time a user is seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. The in-memory append
    /// has already happened at that point.
    pub async fn append(
        &self,
        user_id: &str,
        display_name: &str,
        content: &str,
        role: Role,
    ) -> MemoryResult<()> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let content = match role {
            Role::User => normalize_user_content(display_name, content),
            Role::Assistant | Role::System => content.to_owned(),
        };

        {
            let mut record = self
                .records
                .entry(user_id.to_owned())
                .or_insert_with(|| ConversationRecord::new(display_name));
            record.turns.push(Turn {
                role,
                content: TurnContent::Text(content),
            });
            trim_front(&mut record.turns, self.max_turns);
        }

        debug!(user_id = %user_id, role = %role, "appended turn");
        self.persist().await
    }

    /// Turns for `user_id`, oldest first. Empty for unknown users.
    #[must_use]
    pub fn read(&self, user_id: &str) -> Vec<Turn> {
        self.records
            .get(user_id)
            .map(|r| r.turns.clone())
            .unwrap_or_default()
    }

    /// Remove one user's record. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn purge(&self, user_id: &str) -> MemoryResult<bool> {
        let outcome = {
            let lock = self.user_lock(user_id);
            let _guard = lock.lock().await;
            self.purge_locked(user_id).await
        };
        self.release_lock(user_id);
        outcome
    }

    async fn purge_locked(&self, user_id: &str) -> MemoryResult<bool> {
        if self.records.remove(user_id).is_none() {
            return Ok(false);
        }
        info!(user_id = %user_id, "purged conversation");
        self.persist().await?;
        Ok(true)
    }

    /// Remove every record. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn purge_all(&self) -> MemoryResult<usize> {
        let removed = self.records.len();
        self.records.clear();
        self.user_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        info!(removed, "purged all conversations");
        self.persist().await?;
        Ok(removed)
    }

    /// Copy of every record, ordered by user id.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, ConversationRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a user's lock unless another task still holds it.
    fn release_lock(&self, user_id: &str) {
        self.user_locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, source: std::io::Error) -> MemoryError {
        MemoryError::Persist {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Rewrite the whole file from the current in-memory state.
    async fn persist(&self) -> MemoryResult<()> {
        let _writer = self.writer.lock().await;
        // Snapshot under the writer lock so the last write wins with the
        // latest state.
        let bytes = encode_pretty(&self.snapshot())?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.persist_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.persist_error(e))?;
        Ok(())
    }

    fn write_file_blocking(&self) -> MemoryResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
        }
        let bytes = encode_pretty(&self.snapshot())?;
        std::fs::write(&self.path, bytes).map_err(|e| self.persist_error(e))
    }
}

fn trim_front(turns: &mut Vec<Turn>, max_turns: usize) {
    let excess = turns.len().saturating_sub(max_turns);
    if excess > 0 {
        turns.drain(..excess);
    }
}

/// Four-space indented JSON; non-ASCII is written as-is.
fn encode_pretty<T: Serialize>(value: &T) -> MemoryResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
