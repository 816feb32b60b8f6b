//! Deterministic simulation harness for bbslink.
//!
//! Turmoil-based pieces for running the real [`bbslink_app::Runtime`] against
//! a scripted host over a simulated network:
//!
//! - [`SimEnv`]: virtual clock for the [`bbslink_core::env::Environment`] trait
//! - [`SimBbs`]: a scripted telnet host that records what it receives
//! - [`SimDriver`]: a [`bbslink_app::Driver`] fed from a timed input script,
//!   recording everything the App presents

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_bbs;
pub mod sim_driver;
pub mod sim_env;

pub use sim_bbs::{BBS_PORT, BbsLog, BbsScript, Reply, SimBbs, Stamped};
pub use sim_driver::{SimDriver, SimDriverError, SimRecord};
pub use sim_env::SimEnv;
