use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Store, StorageError};
use crate::{chatlog::ChatlogSnapshot, roster::RosterSnapshot, triggers::Trigger};

/// In-memory store for tests and simulation.
///
/// Clones share one set of documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    chatlog: ChatlogSnapshot,
    roster: RosterSnapshot,
    triggers: Vec<Trigger>,
    saves: usize,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with triggers.
    #[must_use]
    pub fn with_triggers(triggers: Vec<Trigger>) -> Self {
        let store = Self::new();
        store.lock().triggers = triggers;
        store
    }

    /// Number of successful saves of any document.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn load_chatlog(&self) -> Result<ChatlogSnapshot, StorageError> {
        Ok(self.lock().chatlog.clone())
    }

    fn save_chatlog(&self, chatlog: &ChatlogSnapshot) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.chatlog = chatlog.clone();
        inner.saves += 1;
        Ok(())
    }

    fn load_roster(&self) -> Result<RosterSnapshot, StorageError> {
        Ok(self.lock().roster.clone())
    }

    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.roster = roster.clone();
        inner.saves += 1;
        Ok(())
    }

    fn load_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        Ok(self.lock().triggers.clone())
    }

    fn save_triggers(&self, triggers: &[Trigger]) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.triggers = triggers.to_vec();
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_documents() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.save_triggers(&[Trigger::new("a", "b")]).unwrap();
        assert_eq!(other.load_triggers().unwrap(), vec![Trigger::new("a", "b")]);
        assert_eq!(other.save_count(), 1);
    }

    #[test]
    fn empty_by_default() {
        let store = MemoryStore::new();
        assert!(store.load_chatlog().unwrap().is_empty());
        assert_eq!(store.load_roster().unwrap(), RosterSnapshot::default());
    }
}
