//! JSON documents in a data directory.
//!
//! ```text
//! <dir>/chatlog.json       {"sender": ["[ts] message", ...]}
//! <dir>/chat_members.json  ["name", ...]
//! <dir>/last_seen.json     {"lowercase name": unix_seconds}
//! <dir>/triggers.json      [{"trigger": "...", "response": "..."}]
//! ```
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous document intact.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Serialize, de::DeserializeOwned};

use super::{Store, StorageError};
use crate::{chatlog::ChatlogSnapshot, roster::RosterSnapshot, triggers::Trigger};

const CHATLOG: &str = "chatlog.json";
const MEMBERS: &str = "chat_members.json";
const LAST_SEEN: &str = "last_seen.json";
const TRIGGERS: &str = "triggers.json";

/// Store backed by JSON files in one directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: Arc<PathBuf>,
}

impl JsonStore {
    /// Open a store in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened json store");
        Ok(Self { dir: Arc::new(dir) })
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StorageError> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let bytes = serde_json::to_vec(value)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn load_chatlog(&self) -> Result<ChatlogSnapshot, StorageError> {
        self.read(CHATLOG)
    }

    fn save_chatlog(&self, chatlog: &ChatlogSnapshot) -> Result<(), StorageError> {
        self.write(CHATLOG, chatlog)
    }

    fn load_roster(&self) -> Result<RosterSnapshot, StorageError> {
        let members: Vec<String> = self.read(MEMBERS)?;
        let last_seen: BTreeMap<String, i64> = self.read(LAST_SEEN)?;
        Ok(RosterSnapshot { members, last_seen })
    }

    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StorageError> {
        self.write(MEMBERS, &roster.members)?;
        self.write(LAST_SEEN, &roster.last_seen)
    }

    fn load_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        self.read(TRIGGERS)
    }

    fn save_triggers(&self, triggers: &[Trigger]) -> Result<(), StorageError> {
        self.write(TRIGGERS, triggers)
    }
}
