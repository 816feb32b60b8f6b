//! Session engine core for bbslink.
//!
//! Everything between "bytes arrived" and "this is what the line means" lives
//! here, with no I/O of its own:
//!
//! - [`LineReassembler`]: partial-line buffering across reads
//! - [`AnsiInterpreter`] and [`links`]: styled, link-aware display spans
//! - [`SessionClassifier`]: ordered rules routing each line
//! - [`Roster`], [`Chatlog`], [`TriggerSet`]: the facts extracted from lines
//! - [`Connection`]: lifecycle state machine for the single live connection
//! - [`storage`]: persistence behind the [`Store`] trait
//!
//! # Architecture
//!
//! Components are synchronous and hold plain state. They are driven by one
//! consumer loop (see `bbslink-app`), so none of them lock. Time is supplied
//! through [`env::Environment`] so tests run against a virtual clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod ansi;
pub mod chatlog;
pub mod classifier;
pub mod connection;
pub mod env;
pub mod error;
pub mod links;
pub mod login;
pub mod reassembler;
pub mod roster;
pub mod storage;
pub mod triggers;

pub use ansi::{AnsiInterpreter, Color, StyledSpan, strip_ansi};
pub use chatlog::{ChatMessage, Chatlog, ChatlogSnapshot, DEFAULT_CHATLOG_CAP};
pub use classifier::{Classification, ClassifiedLine, RosterCollection, SessionClassifier};
pub use connection::{ConnectTarget, Connection, ConnectionAction, ConnectionState};
pub use error::ConnectionError;
pub use links::LinkSpan;
pub use login::LoginPrompt;
pub use reassembler::LineReassembler;
pub use roster::{ChatMember, Roster, RosterSnapshot, RosterUpdate};
pub use storage::{JsonStore, MemoryStore, StorageError, Store};
pub use triggers::{Trigger, TriggerSet};
