//! Command-line arguments.

use std::{path::PathBuf, time::Duration};

use bbslink_app::AppConfig;
use bbslink_client::TransportConfig;
use bbslink_core::{DEFAULT_CHATLOG_CAP, connection::DEFAULT_PORT};
use bbslink_proto::TerminalIdentity;
use clap::Parser;

/// Chat client for telnet BBS and MUD hosts
#[derive(Parser, Debug, Clone)]
#[command(name = "bbslink")]
#[command(about = "Chat client for telnet BBS and MUD hosts")]
#[command(version)]
pub struct Args {
    /// Host to connect to at startup; `/connect` uses it as the default
    pub host: Option<String>,

    /// TCP port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Terminal type announced to the host
    #[arg(long, default_value = "ansi")]
    pub terminal_type: String,

    /// Screen width announced to the host
    #[arg(long, default_value_t = 136)]
    pub cols: u16,

    /// Screen height announced to the host
    #[arg(long, default_value_t = 50)]
    pub rows: u16,

    /// Username for `/user` and automated sign-in
    #[arg(short, long, env = "BBSLINK_USERNAME", default_value = "")]
    pub username: String,

    /// Password for `/pass` and automated sign-in
    #[arg(long, env = "BBSLINK_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// Answer login prompts automatically
    #[arg(long)]
    pub auto_login: bool,

    /// Send a line terminator every keep-alive period
    #[arg(long)]
    pub keep_alive: bool,

    /// Seconds between keep-alive line terminators
    #[arg(long, default_value_t = 60)]
    pub keep_alive_secs: u64,

    /// Prefix typed text with `Gos `
    #[arg(long)]
    pub mud: bool,

    /// Seconds allowed for the TCP connect
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Directory holding chatlog, member and trigger files
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Cap on the serialized chatlog, in bytes
    #[arg(long, default_value_t = DEFAULT_CHATLOG_CAP)]
    pub chatlog_cap: usize,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Terminal identity from the geometry flags.
    pub fn identity(&self) -> TerminalIdentity {
        TerminalIdentity {
            terminal_type: self.terminal_type.clone(),
            cols: self.cols,
            rows: self.rows,
        }
    }

    /// Application settings.
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            host: self.host.clone().unwrap_or_default(),
            port: self.port,
            identity: self.identity(),
            username: self.username.clone(),
            password: self.password.clone(),
            auto_login: self.auto_login,
            keep_alive: self.keep_alive,
            mud_mode: self.mud,
            chatlog_cap: self.chatlog_cap,
        }
    }

    /// Transport timings. Host, port and identity are filled per connect.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            keep_alive_period: Duration::from_secs(self.keep_alive_secs.max(1)),
            ..TransportConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["bbslink"]).unwrap();
        let config = args.app_config();
        assert_eq!(config.host, "");
        assert_eq!(config.port, 23);
        assert_eq!(config.identity, TerminalIdentity::default());
        assert!(!config.auto_login && !config.keep_alive && !config.mud_mode);
        assert_eq!(config.chatlog_cap, DEFAULT_CHATLOG_CAP);
        assert_eq!(args.transport_config().keep_alive_period, Duration::from_secs(60));
    }

    #[test]
    fn flags_map_into_config() {
        let args = Args::try_parse_from([
            "bbslink",
            "bbs.example.org",
            "-p",
            "2323",
            "--terminal-type",
            "vt100",
            "--cols",
            "80",
            "--rows",
            "24",
            "--username",
            "nate",
            "--auto-login",
            "--keep-alive",
            "--mud",
            "--chatlog-cap",
            "4096",
        ])
        .unwrap();
        let config = args.app_config();
        assert_eq!(config.host, "bbs.example.org");
        assert_eq!(config.port, 2323);
        assert_eq!(config.identity.terminal_type, "vt100");
        assert_eq!((config.identity.cols, config.identity.rows), (80, 24));
        assert_eq!(config.username, "nate");
        assert!(config.auto_login && config.keep_alive && config.mud_mode);
        assert_eq!(config.chatlog_cap, 4096);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(Args::try_parse_from(["bbslink", "-p", "70000"]).is_err());
    }
}
