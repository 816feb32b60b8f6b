//! Connection lifecycle state machine.
//!
//! Tracks the single live BBS connection. Methods return actions for the
//! driver to execute; the state machine itself never touches a socket.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ request_connect ┌────────────┐ on_established ┌───────────┐
//! │ Disconnected │────────────────>│ Connecting │───────────────>│ Connected │
//! └──────────────┘                 └────────────┘                └───────────┘
//!        ↑                               │ request_disconnect          │
//!        │                               ↓                             │
//!        │        on_closed      ┌───────────────┐ request_disconnect  │
//!        └───────────────────────│ Disconnecting │<────────────────────┘
//!                                └───────────────┘
//! ```
//!
//! `on_closed` is accepted from every state: the transport reports exactly
//! one close per connection, and whatever we were doing, we are now
//! disconnected.

use bbslink_proto::TerminalIdentity;

use crate::error::ConnectionError;

/// Default telnet port.
pub const DEFAULT_PORT: u16 = 23;

/// Where to connect and how to identify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Terminal type and window size sent during negotiation
    pub identity: TerminalIdentity,
}

impl ConnectTarget {
    /// Target with the default terminal identity.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, identity: TerminalIdentity::default() }
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport to this target
    Open {
        /// Remote endpoint and identity
        target: ConnectTarget,
        /// Whether the keep-alive timer should start armed
        keep_alive: bool,
    },

    /// Close the live transport
    Close,

    /// Arm or disarm the keep-alive timer of the live transport
    SetKeepAlive(bool),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection
    Disconnected,
    /// Transport is being opened
    Connecting,
    /// Transport is up
    Connected,
    /// Close requested, waiting for the transport to report it
    Disconnecting,
}

/// Connection state machine.
#[derive(Debug, Clone)]
pub struct Connection {
    state: ConnectionState,
    target: Option<ConnectTarget>,
    keep_alive: bool,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Create a connection in [`ConnectionState::Disconnected`].
    #[must_use]
    pub fn new() -> Self {
        Self { state: ConnectionState::Disconnected, target: None, keep_alive: false }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Target of the current or pending connection.
    #[must_use]
    pub fn target(&self) -> Option<&ConnectTarget> {
        self.target.as_ref()
    }

    /// True while a transport exists that accepts writes.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Whether keep-alive is switched on. The setting outlives connections.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Start connecting.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::InvalidState`] unless disconnected
    /// - [`ConnectionError::EmptyHost`] for a blank host
    pub fn request_connect(
        &mut self,
        target: ConnectTarget,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "connect".to_string(),
            });
        }
        if target.host.trim().is_empty() {
            return Err(ConnectionError::EmptyHost);
        }

        self.state = ConnectionState::Connecting;
        self.target = Some(target.clone());
        Ok(vec![ConnectionAction::Open { target, keep_alive: self.keep_alive }])
    }

    /// The transport reported that the TCP connection is up.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::InvalidState`] unless connecting.
    pub fn on_established(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Connected;
                Ok(())
            },
            state => Err(ConnectionError::InvalidState {
                state,
                operation: "establish".to_string(),
            }),
        }
    }

    /// Ask for the connection to close. Idempotent: with nothing to close,
    /// no action is returned.
    pub fn request_disconnect(&mut self) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.state = ConnectionState::Disconnecting;
                vec![ConnectionAction::Close]
            },
            ConnectionState::Disconnecting | ConnectionState::Disconnected => Vec::new(),
        }
    }

    /// The transport is gone. Accepted from every state.
    pub fn on_closed(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.target = None;
    }

    /// Switch keep-alive. Returns the action for a live transport, if any.
    pub fn set_keep_alive(&mut self, enabled: bool) -> Vec<ConnectionAction> {
        self.keep_alive = enabled;
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                vec![ConnectionAction::SetKeepAlive(enabled)]
            },
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ConnectTarget {
        ConnectTarget::new("bbs.example.org", DEFAULT_PORT)
    }

    #[test]
    fn connect_then_establish() {
        let mut conn = Connection::new();
        let actions = conn.request_connect(target()).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Open { target: target(), keep_alive: false }]);
        assert_eq!(conn.state(), ConnectionState::Connecting);

        conn.on_established().unwrap();
        assert!(conn.is_connected());
        assert_eq!(conn.target(), Some(&target()));
    }

    #[test]
    fn second_connect_is_rejected() {
        let mut conn = Connection::new();
        conn.request_connect(target()).unwrap();
        conn.on_established().unwrap();

        let err = conn.request_connect(target()).unwrap_err();
        assert!(err.is_already_connected());
        assert!(conn.is_connected());
    }

    #[test]
    fn blank_host_is_rejected() {
        let mut conn = Connection::new();
        let err = conn.request_connect(ConnectTarget::new("  ", 23)).unwrap_err();
        assert_eq!(err, ConnectionError::EmptyHost);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut conn = Connection::new();
        assert!(conn.request_disconnect().is_empty());

        conn.request_connect(target()).unwrap();
        conn.on_established().unwrap();
        assert_eq!(conn.request_disconnect(), vec![ConnectionAction::Close]);
        assert!(conn.request_disconnect().is_empty());

        conn.on_closed();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.target().is_none());
        assert!(conn.request_disconnect().is_empty());
    }

    #[test]
    fn remote_close_while_connected() {
        let mut conn = Connection::new();
        conn.request_connect(target()).unwrap();
        conn.on_established().unwrap();
        conn.on_closed();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.request_connect(target()).is_ok());
    }

    #[test]
    fn establish_requires_connecting() {
        let mut conn = Connection::new();
        assert!(matches!(
            conn.on_established(),
            Err(ConnectionError::InvalidState { state: ConnectionState::Disconnected, .. })
        ));
    }

    #[test]
    fn keep_alive_survives_reconnect() {
        let mut conn = Connection::new();
        assert!(conn.set_keep_alive(true).is_empty());

        let actions = conn.request_connect(target()).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Open { target: target(), keep_alive: true }]);
        conn.on_established().unwrap();
        assert_eq!(conn.set_keep_alive(false), vec![ConnectionAction::SetKeepAlive(false)]);
        assert!(!conn.keep_alive());
    }
}
