//! Application side effects.
//!
//! [`AppAction`]s are instructions produced by [`crate::App`] for the runtime
//! to execute. Presentation is described by [`DisplayEvent`]s so any front end
//! can render them.

use bbslink_core::{ChatMember, ConnectTarget, ConnectionState, LinkSpan, Trigger};

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// One transcript line, styled and link-split.
    Transcript(Vec<LinkSpan>),

    /// Informational line from the application or transport.
    Notice(String),

    /// Private message, for the directed-message view.
    Directed {
        /// `[YYYY-MM-DD HH:MM:SS] ` prefix
        timestamp: String,
        /// Sending user
        sender: String,
        /// Message body
        message: String,
        /// The line as shown in the transcript
        spans: Vec<LinkSpan>,
    },

    /// Roster replaced.
    RosterChanged {
        /// Everyone present now
        members: Vec<ChatMember>,
        /// Newly present
        joined: Vec<String>,
        /// No longer present
        left: Vec<String>,
    },

    /// Someone is talking; play the attention sound.
    Attention,

    /// Connection state changed.
    Status(ConnectionState),

    /// Member listing requested by the user.
    Members(Vec<ChatMember>),

    /// Chat history requested by the user.
    Chatlog {
        /// Sender shown
        sender: String,
        /// Entries, oldest first
        entries: Vec<String>,
    },

    /// Trigger listing requested by the user.
    Triggers(Vec<Trigger>),
}

/// Document to write to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistTarget {
    /// `chatlog.json`
    Chatlog,
    /// `chat_members.json` and `last_seen.json`
    Roster,
    /// `triggers.json`
    Triggers,
}

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Send one line (the transport appends `\r\n`).
    Transmit(String),

    /// Open a transport.
    Connect {
        /// Where to connect
        target: ConnectTarget,
        /// Start with keep-alive armed
        keep_alive: bool,
    },

    /// Close the transport.
    Disconnect,

    /// Arm or disarm keep-alive on the live transport.
    SetKeepAlive(bool),

    /// Show something.
    Present(DisplayEvent),

    /// Save a document.
    Persist(PersistTarget),

    /// Exit the application.
    Quit,
}
