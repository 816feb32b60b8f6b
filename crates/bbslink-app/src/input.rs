//! Slash-command parsing for line-oriented front ends.
//!
//! A line that does not start with `/` is text for the host. `//` escapes a
//! literal leading slash.
//!
//! ```text
//! /connect [host[:port]] [port]    /disconnect    /quit
//! /keepalive on|off   /auto on|off   /mud on|off
//! /user   /pass
//! /wave [member]   /smile [member]   /dance [member]   /bow [member]
//! /members   /chatlog <sender>   /clearlog <sender>
//! /trigger add <pattern> => <response>   /trigger clear   /triggers
//! ```

use bbslink_core::Trigger;
use thiserror::Error;

use crate::{AppEvent, CannedAction};

/// Input that could not be turned into an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// No such command
    #[error("unknown command: /{0}")]
    UnknownCommand(String),

    /// Command used wrongly
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line of user input.
///
/// # Errors
///
/// [`InputError`] for unknown commands or bad arguments.
pub fn parse_line(line: &str) -> Result<AppEvent, InputError> {
    let Some(command) = line.strip_prefix('/') else {
        return Ok(AppEvent::SendText(line.to_string()));
    };
    if command.starts_with('/') {
        return Ok(AppEvent::SendText(command.to_string()));
    }

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let name = name.to_ascii_lowercase();

    if let Some(action) = CannedAction::from_verb(&name) {
        let target = (!rest.is_empty()).then(|| rest.to_string());
        return Ok(AppEvent::SendAction { action, target });
    }

    match name.as_str() {
        "connect" => parse_connect(rest),
        "disconnect" => Ok(AppEvent::Disconnect),
        "quit" | "exit" => Ok(AppEvent::Quit),
        "keepalive" => parse_toggle(rest, "/keepalive on|off").map(AppEvent::SetKeepAlive),
        "auto" => parse_toggle(rest, "/auto on|off").map(AppEvent::SetAutomation),
        "mud" => parse_toggle(rest, "/mud on|off").map(AppEvent::SetMudMode),
        "user" => Ok(AppEvent::SendUsername),
        "pass" => Ok(AppEvent::SendPassword),
        "members" => Ok(AppEvent::ShowMembers),
        "chatlog" => required(rest, "/chatlog <sender>")
            .map(|sender| AppEvent::ShowChatlog { sender }),
        "clearlog" => required(rest, "/clearlog <sender>")
            .map(|sender| AppEvent::ClearChatlog { sender }),
        "triggers" => Ok(AppEvent::ShowTriggers),
        "trigger" => parse_trigger(rest),
        _ => Err(InputError::UnknownCommand(name)),
    }
}

fn parse_connect(rest: &str) -> Result<AppEvent, InputError> {
    const USAGE: &str = "/connect [host[:port]] [port]";
    let mut words = rest.split_whitespace();
    let Some(address) = words.next() else {
        return Ok(AppEvent::Connect { host: None, port: None });
    };

    let (host, mut port) = match address.rsplit_once(':') {
        Some((host, port)) => {
            (host.to_string(), Some(port.parse().map_err(|_| InputError::Usage(USAGE))?))
        },
        None => (address.to_string(), None),
    };
    if let Some(word) = words.next() {
        port = Some(word.parse().map_err(|_| InputError::Usage(USAGE))?);
    }
    if words.next().is_some() {
        return Err(InputError::Usage(USAGE));
    }
    Ok(AppEvent::Connect { host: Some(host), port })
}

fn parse_toggle(rest: &str, usage: &'static str) -> Result<bool, InputError> {
    match rest.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(InputError::Usage(usage)),
    }
}

fn required(rest: &str, usage: &'static str) -> Result<String, InputError> {
    if rest.is_empty() { Err(InputError::Usage(usage)) } else { Ok(rest.to_string()) }
}

fn parse_trigger(rest: &str) -> Result<AppEvent, InputError> {
    const USAGE: &str = "/trigger add <pattern> => <response> | /trigger clear";
    let (sub, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match sub.to_ascii_lowercase().as_str() {
        "add" => {
            let (pattern, response) = args.split_once("=>").ok_or(InputError::Usage(USAGE))?;
            let trigger = Trigger::new(pattern, response);
            if trigger.is_active() {
                Ok(AppEvent::AddTrigger(trigger))
            } else {
                Err(InputError::Usage(USAGE))
            }
        },
        "clear" => Ok(AppEvent::SetTriggers(Vec::new())),
        _ => Err(InputError::Usage(USAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text() {
        assert_eq!(parse_line("hello all"), Ok(AppEvent::SendText("hello all".into())));
        assert_eq!(parse_line(""), Ok(AppEvent::SendText(String::new())));
        assert_eq!(parse_line("//me"), Ok(AppEvent::SendText("/me".into())));
    }

    #[test]
    fn connect_forms() {
        assert_eq!(parse_line("/connect"), Ok(AppEvent::Connect { host: None, port: None }));
        assert_eq!(
            parse_line("/connect bbs.example.org:2323"),
            Ok(AppEvent::Connect { host: Some("bbs.example.org".into()), port: Some(2323) })
        );
        assert_eq!(
            parse_line("/connect bbs.example.org 23"),
            Ok(AppEvent::Connect { host: Some("bbs.example.org".into()), port: Some(23) })
        );
        assert!(matches!(parse_line("/connect host:nope"), Err(InputError::Usage(_))));
    }

    #[test]
    fn canned_actions() {
        assert_eq!(
            parse_line("/wave Bob"),
            Ok(AppEvent::SendAction { action: CannedAction::Wave, target: Some("Bob".into()) })
        );
        assert_eq!(
            parse_line("/BOW"),
            Ok(AppEvent::SendAction { action: CannedAction::Bow, target: None })
        );
    }

    #[test]
    fn toggles() {
        assert_eq!(parse_line("/keepalive on"), Ok(AppEvent::SetKeepAlive(true)));
        assert_eq!(parse_line("/auto off"), Ok(AppEvent::SetAutomation(false)));
        assert!(parse_line("/mud maybe").is_err());
    }

    #[test]
    fn triggers() {
        assert_eq!(
            parse_line("/trigger add new player => wave"),
            Ok(AppEvent::AddTrigger(Trigger::new("new player", "wave")))
        );
        assert_eq!(parse_line("/trigger clear"), Ok(AppEvent::SetTriggers(vec![])));
        assert!(parse_line("/trigger add  => wave").is_err());
    }

    #[test]
    fn chatlog_commands_need_sender() {
        assert_eq!(parse_line("/chatlog Bob"), Ok(AppEvent::ShowChatlog { sender: "Bob".into() }));
        assert!(matches!(parse_line("/clearlog"), Err(InputError::Usage(_))));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(parse_line("/frobnicate"), Err(InputError::UnknownCommand("frobnicate".into())));
    }
}
