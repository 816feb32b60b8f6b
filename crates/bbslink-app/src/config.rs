//! Application configuration.

use bbslink_core::DEFAULT_CHATLOG_CAP;
use bbslink_proto::TerminalIdentity;

/// Settings the application starts with. Toggles can change at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Default host for a bare connect command
    pub host: String,
    /// Default port
    pub port: u16,
    /// Terminal type and geometry announced to the host
    pub identity: TerminalIdentity,
    /// Username for manual and automated sign-in
    pub username: String,
    /// Password for manual and automated sign-in
    pub password: String,
    /// Answer login prompts automatically
    pub auto_login: bool,
    /// Send a line terminator every keep-alive period
    pub keep_alive: bool,
    /// Prefix typed text with `Gos ` (MUD gossip channel)
    pub mud_mode: bool,
    /// Cap on the serialized chatlog, in bytes
    pub chatlog_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 23,
            identity: TerminalIdentity::default(),
            username: String::new(),
            password: String::new(),
            auto_login: false,
            keep_alive: false,
            mud_mode: false,
            chatlog_cap: DEFAULT_CHATLOG_CAP,
        }
    }
}
