//! Driver trait for abstracting I/O.
//!
//! The [`Driver`] decouples the runtime from specific presentation and
//! transport implementations. Each front end implements it; the generic
//! [`crate::Runtime`] handles orchestration.
//!
//! # Implementations
//!
//! - **Console**: crossterm output, line input from stdin, TCP transport
//! - **Simulation**: scripted input, turmoil transport, recorded output

use std::{future::Future, time::Duration};

use bbslink_client::Inbound;
use bbslink_core::ConnectTarget;

use crate::{AppEvent, DisplayEvent};

/// Abstracts I/O for the application runtime.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait up to `timeout` for the next user event.
    ///
    /// Returns `None` if nothing arrived in time.
    fn poll_event(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Start a transport to `target`. Progress and failure arrive later
    /// through [`drain_delivery`](Driver::drain_delivery).
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport cannot even be started.
    fn connect(&mut self, target: &ConnectTarget, keep_alive: bool) -> Result<(), Self::Error>;

    /// Everything the transport delivered since the last call, in order.
    fn drain_delivery(&mut self) -> Vec<Inbound>;

    /// Send one line.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no live transport.
    fn transmit(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Arm or disarm keep-alive on the live transport.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no live transport.
    fn set_keep_alive(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Ask the live transport to close. Must not block.
    fn disconnect(&mut self);

    /// Show a display event.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn present(&mut self, event: &DisplayEvent) -> Result<(), Self::Error>;

    /// Close the live transport and release resources before exit, waiting up
    /// to `grace` for the transport to flush and report its end.
    fn stop(&mut self, grace: Duration) -> impl Future<Output = ()> + Send;
}
