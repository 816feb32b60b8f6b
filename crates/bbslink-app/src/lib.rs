//! Application layer for bbslink.
//!
//! A pure state machine plus a generic runtime, so the same orchestration runs
//! in the terminal front end and in deterministic simulation.
//!
//! # Components
//!
//! - [`App`]: session state machine (line routing, commands, delayed sends)
//! - [`Driver`]: trait for platform-specific presentation and transport I/O
//! - [`Runtime`]: generic consumer loop tying App, Driver and a
//!   [`Store`](bbslink_core::Store) together
//! - [`input`]: slash-command parsing for line-oriented front ends

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod config;
mod driver;
mod event;
pub mod input;
mod runtime;

pub use action::{AppAction, DisplayEvent, PersistTarget};
pub use app::App;
pub use config::AppConfig;
pub use driver::Driver;
pub use event::{AppEvent, CannedAction};
pub use runtime::{POLL_TIMEOUT, Runtime, SHUTDOWN_GRACE};
