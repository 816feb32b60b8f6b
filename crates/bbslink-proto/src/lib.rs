//! Wire codec for bbslink.
//!
//! Everything needed to turn the raw bytes of a telnet session with a legacy
//! bulletin-board host into text, and text back into bytes:
//!
//! - [`TelnetParser`]: byte-stream FSM separating data from `IAC` commands
//! - [`Negotiator`]: answers option requests for terminal type and window size
//! - [`cp437`]: the IBM PC code page most BBS content is written in
//!
//! The codec is Sans-IO. Callers feed bytes in and write the returned bytes
//! out; nothing here touches a socket.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cp437;
pub mod telnet;

pub use telnet::{Negotiator, TelnetEvent, TelnetParser, TerminalIdentity, escape_iac};
