//! Console driver.
//!
//! Implements [`Driver`] for a plain terminal: stdin is read line by line on
//! its own thread, display events are rendered to stdout, and the transport is
//! a TCP [`Link`]. The reader is a detached OS thread so a blocked stdin read
//! never holds up runtime shutdown.

use std::{
    io::{self, BufRead, Stdout, stdin, stdout},
    thread,
    time::Duration,
};

use bbslink_app::{AppEvent, DisplayEvent, Driver, input};
use bbslink_client::{Inbound, Link, TransportConfig, TransportError};
use bbslink_core::ConnectTarget;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::Renderer;

/// Console driver errors.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Console driver implementing the [`Driver`] trait.
pub struct ConsoleDriver {
    lines: mpsc::UnboundedReceiver<String>,
    link: Link,
    transport: TransportConfig,
    renderer: Renderer<Stdout>,
}

impl ConsoleDriver {
    /// Start reading stdin. `transport` supplies timings for every connect.
    pub fn new(transport: TransportConfig, color: bool) -> Self {
        let (tx, lines) = mpsc::unbounded_channel();
        thread::spawn(move || {
            for line in stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    },
                }
            }
        });

        Self { lines, link: Link::new(), transport, renderer: Renderer::new(stdout(), color) }
    }
}

impl Driver for ConsoleDriver {
    type Error = ConsoleError;

    async fn poll_event(&mut self, timeout: Duration) -> Result<Option<AppEvent>, ConsoleError> {
        let line = match tokio::time::timeout(timeout, self.lines.recv()).await {
            Err(_) => return Ok(None),
            // End of input ends the session.
            Ok(None) => return Ok(Some(AppEvent::Quit)),
            Ok(Some(line)) => line,
        };

        match input::parse_line(&line) {
            Ok(event) => Ok(Some(event)),
            Err(e) => {
                self.renderer.render(&DisplayEvent::Notice(e.to_string()))?;
                Ok(None)
            },
        }
    }

    fn connect(&mut self, target: &ConnectTarget, keep_alive: bool) -> Result<(), ConsoleError> {
        let config = TransportConfig {
            host: target.host.clone(),
            port: target.port,
            identity: target.identity.clone(),
            ..self.transport.clone()
        };
        self.link.open(config, keep_alive);
        Ok(())
    }

    fn drain_delivery(&mut self) -> Vec<Inbound> {
        self.link.drain()
    }

    fn transmit(&mut self, text: &str) -> Result<(), ConsoleError> {
        Ok(self.link.send(text)?)
    }

    fn set_keep_alive(&mut self, enabled: bool) -> Result<(), ConsoleError> {
        Ok(self.link.set_keep_alive(enabled)?)
    }

    fn disconnect(&mut self) {
        self.link.disconnect();
    }

    fn present(&mut self, event: &DisplayEvent) -> Result<(), ConsoleError> {
        Ok(self.renderer.render(event)?)
    }

    async fn stop(&mut self, grace: Duration) {
        self.lines.close();
        self.link.close(grace).await;
    }
}

impl Drop for ConsoleDriver {
    fn drop(&mut self) {
        self.link.disconnect();
        self.lines.close();
    }
}
