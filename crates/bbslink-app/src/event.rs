//! Application input events.
//!
//! Events come from two sources:
//! - the user (commands, typed text, toggles) and periodic ticks
//! - the transport, via the delivery queue

use bbslink_client::Inbound;
use bbslink_core::Trigger;

/// Canned social actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedAction {
    /// `wave`
    Wave,
    /// `smile`
    Smile,
    /// `dance`
    Dance,
    /// `bow`
    Bow,
}

impl CannedAction {
    /// Command word sent to the host.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::Smile => "smile",
            Self::Dance => "dance",
            Self::Bow => "bow",
        }
    }

    /// Parse a command word.
    #[must_use]
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb.to_ascii_lowercase().as_str() {
            "wave" => Some(Self::Wave),
            "smile" => Some(Self::Smile),
            "dance" => Some(Self::Dance),
            "bow" => Some(Self::Bow),
            _ => None,
        }
    }
}

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Connect, to the configured host unless one is given.
    Connect {
        /// Host override
        host: Option<String>,
        /// Port override
        port: Option<u16>,
    },

    /// Close the connection.
    Disconnect,

    /// Close the connection and exit.
    Quit,

    /// Text typed by the user.
    SendText(String),

    /// Canned action, optionally aimed at a member.
    SendAction {
        /// What to do
        action: CannedAction,
        /// Member it is aimed at
        target: Option<String>,
    },

    /// Send the configured username.
    SendUsername,

    /// Send the configured password.
    SendPassword,

    /// Toggle keep-alive.
    SetKeepAlive(bool),

    /// Toggle automated login.
    SetAutomation(bool),

    /// Toggle the MUD `Gos ` prefix.
    SetMudMode(bool),

    /// Replace every trigger.
    SetTriggers(Vec<Trigger>),

    /// Append one trigger.
    AddTrigger(Trigger),

    /// Forget the chat history of one sender.
    ClearChatlog {
        /// Sender whose history goes
        sender: String,
    },

    /// List current members.
    ShowMembers,

    /// Show the chat history of one sender.
    ShowChatlog {
        /// Sender to show
        sender: String,
    },

    /// List triggers.
    ShowTriggers,

    /// Transport connected.
    Connected {
        /// Remote host
        host: String,
        /// Remote port
        port: u16,
    },

    /// Text received. May end mid-line.
    Chunk(String),

    /// Informational line from the transport.
    Notice(String),

    /// Transport gone.
    Disconnected,

    /// Periodic tick.
    Tick,
}

impl From<Inbound> for AppEvent {
    fn from(inbound: Inbound) -> Self {
        match inbound {
            Inbound::Connected { host, port } => Self::Connected { host, port },
            Inbound::Chunk(text) => Self::Chunk(text),
            Inbound::Notice(text) => Self::Notice(text),
            Inbound::Disconnected => Self::Disconnected,
        }
    }
}
