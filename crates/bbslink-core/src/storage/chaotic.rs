//! Fault-injecting store wrapper.
//!
//! Delegates to an inner store but fails a configurable fraction of
//! operations. Used by simulation tests to check that persistence failures
//! never disturb the in-memory session.

use std::sync::{Arc, Mutex, PoisonError};

use super::{Store, StorageError};
use crate::{chatlog::ChatlogSnapshot, roster::RosterSnapshot, triggers::Trigger};

/// Store wrapper that randomly fails operations.
#[derive(Clone)]
pub struct ChaoticStore<S: Store> {
    inner: S,
    /// 0.0 never fails, 1.0 always fails
    failure_rate: f64,
    rng: Arc<Mutex<Lcg>>,
}

/// Deterministic linear congruential generator so chaos runs reproduce.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn next(&mut self) -> f64 {
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = A.wrapping_mul(self.state).wrapping_add(C) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Store> ChaoticStore<S> {
    /// Wrap `inner`, failing with probability `failure_rate` (clamped to
    /// `0.0..=1.0`).
    pub fn new(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(Lcg { state: seed })),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn roll(&self, operation: &str) -> Result<(), StorageError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if rng.next() < self.failure_rate {
            return Err(StorageError::Io(format!("injected failure: {operation}")));
        }
        Ok(())
    }
}

impl<S: Store> Store for ChaoticStore<S> {
    fn load_chatlog(&self) -> Result<ChatlogSnapshot, StorageError> {
        self.roll("load_chatlog")?;
        self.inner.load_chatlog()
    }

    fn save_chatlog(&self, chatlog: &ChatlogSnapshot) -> Result<(), StorageError> {
        self.roll("save_chatlog")?;
        self.inner.save_chatlog(chatlog)
    }

    fn load_roster(&self) -> Result<RosterSnapshot, StorageError> {
        self.roll("load_roster")?;
        self.inner.load_roster()
    }

    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StorageError> {
        self.roll("save_roster")?;
        self.inner.save_roster(roster)
    }

    fn load_triggers(&self) -> Result<Vec<Trigger>, StorageError> {
        self.roll("load_triggers")?;
        self.inner.load_triggers()
    }

    fn save_triggers(&self, triggers: &[Trigger]) -> Result<(), StorageError> {
        self.roll("save_triggers")?;
        self.inner.save_triggers(triggers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn always_fails_at_full_rate() {
        let store = ChaoticStore::new(MemoryStore::new(), 1.0, 7);
        assert!(matches!(store.load_triggers(), Err(StorageError::Io(_))));
        assert!(store.save_triggers(&[]).is_err());
        assert_eq!(store.inner().save_count(), 0);
    }

    #[test]
    fn never_fails_at_zero_rate() {
        let store = ChaoticStore::new(MemoryStore::new(), 0.0, 7);
        for _ in 0..50 {
            store.save_triggers(&[]).unwrap();
        }
        assert_eq!(store.inner().save_count(), 50);
    }

    #[test]
    fn same_seed_same_failures() {
        let a = ChaoticStore::new(MemoryStore::new(), 0.5, 99);
        let b = ChaoticStore::new(MemoryStore::new(), 0.5, 99);
        let run = |s: &ChaoticStore<MemoryStore>| {
            (0..32).map(|_| s.save_triggers(&[]).is_ok()).collect::<Vec<_>>()
        };
        assert_eq!(run(&a), run(&b));
    }
}
