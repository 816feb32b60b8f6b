//! Console rendering of display events.
//!
//! Colors and link underlines are written as crossterm commands when color
//! is on; otherwise output is plain text, which is also what the tests read.

use std::io::{self, Write};

use bbslink_app::DisplayEvent;
use bbslink_core::{ChatMember, ConnectionState, LinkSpan, Trigger, ansi::Color};
use chrono::{DateTime, FixedOffset, Local};
use crossterm::{
    queue,
    style::{self, Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
};

/// Color used for application notices.
const NOTICE: style::Color = style::Color::DarkGrey;
/// Color used for private messages.
const DIRECTED: style::Color = style::Color::Magenta;

/// Writes display events to a console.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
    offset: FixedOffset,
}

impl<W: Write> Renderer<W> {
    /// Renderer using the local timezone for last-seen times.
    pub fn new(out: W, color: bool) -> Self {
        Self::with_offset(out, color, *Local::now().offset())
    }

    /// Renderer with a fixed timezone.
    pub fn with_offset(out: W, color: bool, offset: FixedOffset) -> Self {
        Self { out, color, offset }
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write one event and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn render(&mut self, event: &DisplayEvent) -> io::Result<()> {
        match event {
            DisplayEvent::Transcript(spans) => {
                self.spans(spans)?;
                self.newline()?;
            },
            DisplayEvent::Notice(text) => self.line(NOTICE, &format!("-- {text}"))?,
            DisplayEvent::Directed { timestamp, sender, message, .. } => {
                self.line(DIRECTED, &format!(">> {timestamp}{sender}: {message}"))?;
            },
            DisplayEvent::RosterChanged { members, joined, left } => {
                if !joined.is_empty() {
                    self.line(NOTICE, &format!("-- Joined: {}", joined.join(", ")))?;
                }
                if !left.is_empty() {
                    self.line(NOTICE, &format!("-- Left: {}", left.join(", ")))?;
                }
                let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
                self.line(NOTICE, &format!("-- Present ({}): {}", names.len(), names.join(", ")))?;
            },
            DisplayEvent::Attention => {
                if self.color {
                    queue!(self.out, Print('\x07'))?;
                }
            },
            DisplayEvent::Status(state) => {
                self.line(NOTICE, &format!("-- Status: {}", status_label(*state)))?;
            },
            DisplayEvent::Members(members) => self.members(members)?,
            DisplayEvent::Chatlog { sender, entries } => {
                if entries.is_empty() {
                    self.line(NOTICE, &format!("-- No chat history for {sender}."))?;
                } else {
                    self.line(NOTICE, &format!("-- Chat history for {sender}:"))?;
                    for entry in entries {
                        self.plain(&format!("   {entry}"))?;
                    }
                }
            },
            DisplayEvent::Triggers(triggers) => self.triggers(triggers)?,
        }
        self.out.flush()
    }

    fn spans(&mut self, spans: &[LinkSpan]) -> io::Result<()> {
        for span in spans {
            if !self.color {
                queue!(self.out, Print(&span.text))?;
                continue;
            }
            if let Some(color) = terminal_color(span.style) {
                queue!(self.out, SetForegroundColor(color))?;
            }
            if span.is_link {
                queue!(self.out, SetAttribute(Attribute::Underlined))?;
            }
            queue!(self.out, Print(&span.text), SetAttribute(Attribute::Reset), ResetColor)?;
        }
        Ok(())
    }

    fn members(&mut self, members: &[ChatMember]) -> io::Result<()> {
        if members.is_empty() {
            return self.line(NOTICE, "-- Nobody is here.");
        }
        self.line(NOTICE, &format!("-- Members ({}):", members.len()))?;
        for member in members {
            let seen = member
                .last_seen
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|t| t.with_timezone(&self.offset).format("%Y-%m-%d %H:%M").to_string());
            match seen {
                Some(seen) => self.plain(&format!("   {} (seen {seen})", member.name))?,
                None => self.plain(&format!("   {}", member.name))?,
            }
        }
        Ok(())
    }

    fn triggers(&mut self, triggers: &[Trigger]) -> io::Result<()> {
        if triggers.is_empty() {
            return self.line(NOTICE, "-- No triggers.");
        }
        self.line(NOTICE, "-- Triggers:")?;
        for (i, trigger) in triggers.iter().enumerate() {
            self.plain(&format!("   {}. {} => {}", i + 1, trigger.pattern, trigger.response))?;
        }
        Ok(())
    }

    fn line(&mut self, color: style::Color, text: &str) -> io::Result<()> {
        if self.color {
            queue!(self.out, SetForegroundColor(color), Print(text), ResetColor)?;
        } else {
            queue!(self.out, Print(text))?;
        }
        self.newline()
    }

    fn plain(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, Print(text))?;
        self.newline()
    }

    fn newline(&mut self) -> io::Result<()> {
        queue!(self.out, Print('\n'))
    }
}

fn status_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
        ConnectionState::Disconnecting => "disconnecting",
    }
}

/// Console color for an interpreted foreground. `None` keeps the default.
fn terminal_color(color: Color) -> Option<style::Color> {
    let mapped = match color {
        Color::Normal => return None,
        Color::Black => style::Color::Black,
        Color::Red => style::Color::DarkRed,
        Color::Green => style::Color::DarkGreen,
        Color::Yellow => style::Color::DarkYellow,
        Color::Blue => style::Color::DarkBlue,
        Color::Magenta => style::Color::DarkMagenta,
        Color::Cyan => style::Color::DarkCyan,
        Color::White => style::Color::Grey,
        Color::BrightBlack => style::Color::DarkGrey,
        Color::BrightRed => style::Color::Red,
        Color::BrightGreen => style::Color::Green,
        Color::BrightYellow => style::Color::Yellow,
        Color::BrightBlue => style::Color::Blue,
        Color::BrightMagenta => style::Color::Magenta,
        Color::BrightCyan => style::Color::Cyan,
        Color::BrightWhite => style::Color::White,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_plain(events: &[DisplayEvent]) -> String {
        let mut renderer = Renderer::with_offset(Vec::new(), false, FixedOffset::east_opt(0).unwrap());
        for event in events {
            renderer.render(event).unwrap();
        }
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn span(text: &str, is_link: bool) -> LinkSpan {
        LinkSpan { text: text.into(), style: Color::Normal, is_link }
    }

    #[test]
    fn transcript_and_notices() {
        let output = render_plain(&[
            DisplayEvent::Status(ConnectionState::Connecting),
            DisplayEvent::Notice("Connecting to bbs.test:23...".into()),
            DisplayEvent::Transcript(vec![span("see ", false), span("https://x.org", true)]),
            DisplayEvent::Attention,
        ]);
        insta::assert_snapshot!(output, @r"
        -- Status: connecting
        -- Connecting to bbs.test:23...
        see https://x.org
        ");
    }

    #[test]
    fn roster_and_listings() {
        let output = render_plain(&[
            DisplayEvent::RosterChanged {
                members: vec![ChatMember { name: "Alice".into(), last_seen: Some(0) }],
                joined: vec!["Alice".into()],
                left: vec!["Bob".into()],
            },
            DisplayEvent::Members(vec![
                ChatMember { name: "Alice".into(), last_seen: Some(86_400) },
                ChatMember { name: "Zed".into(), last_seen: None },
            ]),
            DisplayEvent::Triggers(vec![Trigger::new("new player", "wave")]),
            DisplayEvent::Chatlog { sender: "Bob".into(), entries: vec![] },
        ]);
        insta::assert_snapshot!(output, @r"
        -- Joined: Alice
        -- Left: Bob
        -- Present (1): Alice
        -- Members (2):
           Alice (seen 1970-01-02 00:00)
           Zed
        -- Triggers:
           1. new player => wave
        -- No chat history for Bob.
        ");
    }

    #[test]
    fn directed_line() {
        let output = render_plain(&[DisplayEvent::Directed {
            timestamp: "[2025-06-01 09:30:00] ".into(),
            sender: "Alice".into(),
            message: "secret".into(),
            spans: vec![],
        }]);
        assert_eq!(output, ">> [2025-06-01 09:30:00] Alice: secret\n");
    }

    #[test]
    fn color_output_carries_escapes() {
        let mut renderer = Renderer::with_offset(Vec::new(), true, FixedOffset::east_opt(0).unwrap());
        renderer
            .render(&DisplayEvent::Transcript(vec![LinkSpan {
                text: "RED".into(),
                style: Color::Red,
                is_link: false,
            }]))
            .unwrap();
        renderer.render(&DisplayEvent::Attention).unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(output.contains("RED"));
        assert!(output.contains('\x1b'));
        assert!(output.ends_with('\x07'));
    }
}
