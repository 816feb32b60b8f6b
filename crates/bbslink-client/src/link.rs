//! Per-driver connection slot.
//!
//! A driver keeps one [`Link`] for its whole life. The delivery queue outlives
//! individual sessions; the session handle is replaced on every connect and
//! dropped once the session reports [`Inbound::Disconnected`].

use std::{future::Future, io, time::Duration};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::transport::{
    DeliveryQueue, DeliverySender, Dispatcher, Inbound, SessionHandle, TransportConfig,
    TransportError, delivery_channel, open, open_with,
};

/// Delivery queue plus the live session, if any.
#[derive(Debug)]
pub struct Link {
    tx: DeliverySender,
    queue: DeliveryQueue,
    session: Option<SessionHandle>,
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}

impl Link {
    /// Link with no session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, queue) = delivery_channel();
        Self { tx, queue, session: None }
    }

    /// Connect over TCP.
    pub fn open(&mut self, config: TransportConfig, keep_alive: bool) {
        let handle = open(config, keep_alive, self.tx.clone());
        self.attach(handle);
    }

    /// Connect through a custom connect future.
    pub fn open_with<F, S>(&mut self, config: TransportConfig, keep_alive: bool, connect: F)
    where
        F: Future<Output = io::Result<S>> + Send + 'static,
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let handle = open_with(config, keep_alive, self.tx.clone(), connect);
        self.attach(handle);
    }

    /// Adopt a session. A session it replaces is told to stop and left to
    /// finish on its own.
    pub fn attach(&mut self, handle: SessionHandle) {
        if let Some(old) = self.session.replace(handle) {
            tracing::warn!("replacing a live session");
            old.dispatcher().disconnect();
        }
    }

    /// Everything delivered since the last drain.
    pub fn drain(&mut self) -> Vec<Inbound> {
        let items = self.queue.drain();
        if items.contains(&Inbound::Disconnected) {
            self.session = None;
        }
        items
    }

    /// Whether a session is attached and has not reported its end yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Send one line.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] without a live session.
    pub fn send(&self, text: &str) -> Result<(), TransportError> {
        self.dispatcher()?.send(text)
    }

    /// Arm or disarm keep-alive on the live session.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] without a live session.
    pub fn set_keep_alive(&self, enabled: bool) -> Result<(), TransportError> {
        self.dispatcher()?.set_keep_alive(enabled)
    }

    /// Ask the live session to close. No-op without one.
    pub fn disconnect(&self) {
        if let Some(session) = &self.session {
            session.dispatcher().disconnect();
        }
    }

    /// Close the live session and wait up to `grace` for it to flush and
    /// report its end. The end is still read through [`Link::drain`].
    ///
    /// Returns `false` if the session was still running when `grace` ran out.
    pub async fn close(&mut self, grace: Duration) -> bool {
        let Some(session) = self.session.take() else {
            return true;
        };
        session.dispatcher().disconnect();
        let finished = tokio::time::timeout(grace, session.join()).await.is_ok();
        if !finished {
            tracing::warn!(?grace, "session did not close in time");
        }
        finished
    }

    fn dispatcher(&self) -> Result<&Dispatcher, TransportError> {
        self.session.as_ref().map(SessionHandle::dispatcher).ok_or(TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, duplex};

    use super::*;
    use crate::spawn_with_stream;

    async fn settle(link: &mut Link, until: &Inbound) -> Vec<Inbound> {
        let mut seen = Vec::new();
        for _ in 0..100 {
            seen.extend(link.drain());
            if seen.contains(until) {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("never saw {until:?}, got {seen:?}");
    }

    #[tokio::test]
    async fn send_without_session_is_closed() {
        let link = Link::new();
        assert_eq!(link.send("x"), Err(TransportError::Closed));
        assert!(!link.is_open());
        link.disconnect();
    }

    #[tokio::test]
    async fn dispatcher_dropped_after_disconnect() {
        let mut link = Link::new();
        let (client, mut server) = duplex(64);
        let handle = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, link.tx.clone());
        link.attach(handle);
        settle(&mut link, &Inbound::Connected { host: "bbs".into(), port: 23 }).await;

        link.send("hi").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi\r\n");

        link.disconnect();
        settle(&mut link, &Inbound::Disconnected).await;
        assert!(!link.is_open());
    }

    #[tokio::test]
    async fn close_flushes_and_waits_for_the_session() {
        let mut link = Link::new();
        let (client, mut server) = duplex(64);
        let handle = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, link.tx.clone());
        link.attach(handle);

        link.send("bye").unwrap();
        assert!(link.close(Duration::from_secs(5)).await);
        assert!(!link.is_open());

        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"bye\r\n");

        let items = link.drain();
        assert_eq!(
            items[items.len() - 2..],
            [Inbound::Notice("Disconnected from BBS.".into()), Inbound::Disconnected]
        );
    }

    #[tokio::test]
    async fn close_without_session_is_immediate() {
        let mut link = Link::new();
        assert!(link.close(Duration::ZERO).await);
    }
}
