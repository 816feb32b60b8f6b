//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the console driver but for
//! deterministic testing. User input comes from a timed script, the transport
//! runs over turmoil TCP, and every display event and transmitted line is
//! recorded. The same [`bbslink_app::Runtime`] orchestration code runs in both
//! production and simulation.

use std::{collections::VecDeque, time::Duration};

use bbslink_app::{AppEvent, DisplayEvent, Driver};
use bbslink_client::{Inbound, Link, TransportConfig};
use bbslink_core::{ConnectTarget, LinkSpan};
use tokio::time::Instant;

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// What the App did through the driver.
#[derive(Debug, Clone, Default)]
pub struct SimRecord {
    /// Display events, in order
    pub presented: Vec<DisplayEvent>,
    /// Lines handed to the transport, in order
    pub transmitted: Vec<String>,
    /// Connect requests
    pub connects: Vec<ConnectTarget>,
    /// Whether the runtime stopped the driver
    pub stopped: bool,
}

impl SimRecord {
    /// Notice texts, in order.
    pub fn notices(&self) -> Vec<&str> {
        self.presented
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Transcript lines as plain text.
    pub fn transcript(&self) -> Vec<String> {
        self.presented
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Transcript(spans) => {
                    Some(spans.iter().map(|s| s.text.as_str()).collect())
                },
                _ => None,
            })
            .collect()
    }

    /// Every span marked as a link.
    pub fn links(&self) -> Vec<&LinkSpan> {
        self.presented
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Transcript(spans) => Some(spans),
                _ => None,
            })
            .flatten()
            .filter(|s| s.is_link)
            .collect()
    }

    /// Number of attention signals.
    pub fn attention_count(&self) -> usize {
        self.presented.iter().filter(|e| matches!(e, DisplayEvent::Attention)).count()
    }
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    script: VecDeque<(Duration, AppEvent)>,
    origin: Instant,
    link: Link,
    transport: TransportConfig,
    record: SimRecord,
}

impl SimDriver {
    /// Driver releasing each scripted event once its offset from now has
    /// passed. Must be created inside the simulation.
    pub fn new(mut script: Vec<(Duration, AppEvent)>) -> Self {
        script.sort_by_key(|(at, _)| *at);
        Self {
            script: script.into(),
            origin: Instant::now(),
            link: Link::new(),
            transport: TransportConfig::default(),
            record: SimRecord::default(),
        }
    }

    /// Use `config` for timings on every connect.
    #[must_use]
    pub fn with_transport(mut self, config: TransportConfig) -> Self {
        self.transport = config;
        self
    }

    /// Everything recorded so far.
    pub fn record(&self) -> &SimRecord {
        &self.record
    }

    /// Scripted events not yet released.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self, timeout: Duration) -> Result<Option<AppEvent>, SimDriverError> {
        let elapsed = Instant::now() - self.origin;
        let wait = match self.script.front() {
            Some((at, _)) if *at <= elapsed => {
                return Ok(self.script.pop_front().map(|(_, event)| event));
            },
            Some((at, _)) => (*at - elapsed).min(timeout),
            None => timeout,
        };
        tokio::time::sleep(wait).await;
        Ok(None)
    }

    fn connect(&mut self, target: &ConnectTarget, keep_alive: bool) -> Result<(), SimDriverError> {
        self.record.connects.push(target.clone());
        let config = TransportConfig {
            host: target.host.clone(),
            port: target.port,
            identity: target.identity.clone(),
            ..self.transport.clone()
        };
        let addr = format!("{}:{}", target.host, target.port);
        self.link.open_with(config, keep_alive, async move {
            turmoil::net::TcpStream::connect(addr).await
        });
        Ok(())
    }

    fn drain_delivery(&mut self) -> Vec<Inbound> {
        self.link.drain()
    }

    fn transmit(&mut self, text: &str) -> Result<(), SimDriverError> {
        self.record.transmitted.push(text.to_string());
        self.link.send(text).map_err(|e| SimDriverError(e.to_string()))
    }

    fn set_keep_alive(&mut self, enabled: bool) -> Result<(), SimDriverError> {
        self.link.set_keep_alive(enabled).map_err(|e| SimDriverError(e.to_string()))
    }

    fn disconnect(&mut self) {
        self.link.disconnect();
    }

    fn present(&mut self, event: &DisplayEvent) -> Result<(), SimDriverError> {
        self.record.presented.push(event.clone());
        Ok(())
    }

    async fn stop(&mut self, grace: Duration) {
        self.link.close(grace).await;
        self.record.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn releases_events_on_schedule() {
        let mut driver = SimDriver::new(vec![
            (Duration::from_millis(250), AppEvent::Quit),
            (Duration::ZERO, AppEvent::ShowMembers),
        ]);
        let timeout = Duration::from_millis(100);

        assert_eq!(driver.poll_event(timeout).await.unwrap(), Some(AppEvent::ShowMembers));
        assert_eq!(driver.poll_event(timeout).await.unwrap(), None);
        assert_eq!(driver.poll_event(timeout).await.unwrap(), None);
        assert_eq!(driver.poll_event(timeout).await.unwrap(), None);
        assert_eq!(driver.poll_event(timeout).await.unwrap(), Some(AppEvent::Quit));
        assert_eq!(driver.remaining(), 0);
    }

    #[tokio::test]
    async fn transmit_without_session_fails_but_is_recorded() {
        let mut driver = SimDriver::new(vec![]);
        assert!(driver.transmit("hello").is_err());
        assert_eq!(driver.record().transmitted, ["hello"]);
    }
}
