//! Console front end for bbslink.
//!
//! A thin shell over [`bbslink_app::Driver`]: typed lines become
//! [`bbslink_app::AppEvent`]s, display events become colored console output.
//! All orchestration lives in the generic [`bbslink_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod console;
pub mod logging;
pub mod render;

pub use args::Args;
pub use console::{ConsoleDriver, ConsoleError};
pub use render::Renderer;
