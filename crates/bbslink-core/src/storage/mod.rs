//! Persistence for roster, chatlog and triggers.
//!
//! The [`Store`] trait is synchronous: the consumer loop saves small JSON
//! documents between polls, and a failed save only costs durability, never
//! in-memory state. Implementations share state through `Arc`, so clones see
//! the same data.

mod chaotic;
mod error;
mod json;
mod memory;

pub use chaotic::ChaoticStore;
pub use error::StorageError;
pub use json::JsonStore;
pub use memory::MemoryStore;

use crate::{chatlog::ChatlogSnapshot, roster::RosterSnapshot, triggers::Trigger};

/// Storage for the documents that outlive a session.
///
/// A document that has never been saved loads as its empty value.
pub trait Store: Clone + Send + Sync + 'static {
    /// Load the chatlog.
    fn load_chatlog(&self) -> Result<ChatlogSnapshot, StorageError>;

    /// Replace the stored chatlog.
    fn save_chatlog(&self, chatlog: &ChatlogSnapshot) -> Result<(), StorageError>;

    /// Load members and last-seen times.
    fn load_roster(&self) -> Result<RosterSnapshot, StorageError>;

    /// Replace the stored roster.
    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StorageError>;

    /// Load triggers, order preserved.
    fn load_triggers(&self) -> Result<Vec<Trigger>, StorageError>;

    /// Replace the stored triggers.
    fn save_triggers(&self, triggers: &[Trigger]) -> Result<(), StorageError>;
}
