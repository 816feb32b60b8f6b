//! Public chat history.
//!
//! Plain lines shaped like `From <sender>: <message>` (optionally with a
//! `(to <recipient>)` qualifier) are recorded per sender in arrival order.
//! The serialized JSON document is capped; when an append pushes it over the
//! cap, the oldest entry of each sender is dropped in turn until it fits.
//!
//! The size of the document is kept as a running total, adjusted by the delta
//! of each append, trim step and clear, so appends stay cheap however large
//! the log grows.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::LazyLock,
};

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::env::timestamp_prefix;

/// Default cap on the serialized chatlog: 1 GiB.
pub const DEFAULT_CHATLOG_CAP: usize = 1 << 30;

#[allow(clippy::expect_used, reason = "constant pattern")]
static CHAT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*From\s+(\S+)(?:\s+\(to\s+([^)]+)\))?:\s*(.+)$")
        .expect("chat line pattern is valid")
});

/// Persisted form: sender to timestamped entries, oldest first.
pub type ChatlogSnapshot = BTreeMap<String, Vec<String>>;

/// A parsed public chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sending user
    pub sender: String,
    /// Addressee, with `you` resolved to the local username. Never persisted.
    pub recipient: Option<String>,
    /// Message body
    pub message: String,
}

/// Parse a stripped plain line. `own_username` replaces a `you` recipient.
pub fn parse_chat_message(stripped: &str, own_username: &str) -> Option<ChatMessage> {
    let caps = CHAT_LINE.captures(stripped)?;
    let recipient = caps.get(2).map(|r| {
        let r = r.as_str().trim();
        if r.eq_ignore_ascii_case("you") { own_username.to_string() } else { r.to_string() }
    });
    Some(ChatMessage {
        sender: caps[1].to_string(),
        recipient,
        message: caps[3].to_string(),
    })
}

/// Format a chatlog entry: `[YYYY-MM-DD HH:MM:SS] message`.
pub fn format_entry(time: &DateTime<FixedOffset>, message: &str) -> String {
    format!("{}{message}", timestamp_prefix(time))
}

/// Length of `s` once encoded as a JSON string, quotes included.
fn json_str_len(s: &str) -> usize {
    2 + s
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\u{08}' | '\u{0c}' | '\n' | '\r' | '\t' => 2,
            c if (c as u32) < 0x20 => 6,
            c => c.len_utf8(),
        })
        .sum::<usize>()
}

#[derive(Debug, Clone, Default)]
struct SenderLog {
    entries: VecDeque<String>,
    /// Sum of `json_str_len` over `entries`.
    entries_len: usize,
}

impl SenderLog {
    /// Bytes of `"sender":[e1,e2,...]` for this sender.
    fn encoded_len(&self, sender: &str) -> usize {
        json_str_len(sender) + 1 + 2 + self.entries_len + self.entries.len().saturating_sub(1)
    }

    fn push(&mut self, entry: String) {
        self.entries_len += json_str_len(&entry);
        self.entries.push_back(entry);
    }

    fn pop_oldest(&mut self) -> Option<String> {
        let entry = self.entries.pop_front()?;
        self.entries_len -= json_str_len(&entry);
        Some(entry)
    }
}

/// Chat history with a size cap.
#[derive(Debug, Clone)]
pub struct Chatlog {
    senders: BTreeMap<String, SenderLog>,
    cap: usize,
    /// Sum of `SenderLog::encoded_len` over all senders.
    body_len: usize,
}

impl Default for Chatlog {
    fn default() -> Self {
        Self::new(DEFAULT_CHATLOG_CAP)
    }
}

impl Chatlog {
    /// Empty chatlog with the given cap in bytes.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { senders: BTreeMap::new(), cap, body_len: 0 }
    }

    /// Restore from a snapshot, trimming if it already exceeds `cap`.
    #[must_use]
    pub fn from_snapshot(snapshot: ChatlogSnapshot, cap: usize) -> Self {
        let mut log = Self::new(cap);
        for (sender, entries) in snapshot {
            let mut sender_log = SenderLog::default();
            for entry in entries {
                sender_log.push(entry);
            }
            log.body_len += sender_log.encoded_len(&sender);
            log.senders.insert(sender, sender_log);
        }
        log.trim();
        log
    }

    /// Snapshot for persistence.
    #[must_use]
    pub fn snapshot(&self) -> ChatlogSnapshot {
        self.senders
            .iter()
            .map(|(sender, log)| (sender.clone(), log.entries.iter().cloned().collect()))
            .collect()
    }

    /// Cap in bytes.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Byte length of the serialized document.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        2 + self.body_len + self.senders.len().saturating_sub(1)
    }

    /// Senders in the log, sorted. Trimming can leave a sender with no entries.
    pub fn senders(&self) -> impl Iterator<Item = &str> {
        self.senders.keys().map(String::as_str)
    }

    /// Entries recorded for `sender`, oldest first.
    #[must_use]
    pub fn messages(&self, sender: &str) -> Vec<&str> {
        self.senders
            .get(sender)
            .map(|log| log.entries.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.values().map(|log| log.entries.len()).sum()
    }

    /// No entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an already formatted entry. Returns how many old entries were
    /// trimmed to stay under the cap.
    pub fn append(&mut self, sender: &str, entry: String) -> usize {
        let existing = self.senders.get(sender).map(|log| log.encoded_len(sender));
        let log = self.senders.entry(sender.to_string()).or_default();
        log.push(entry);
        self.body_len = self.body_len - existing.unwrap_or(0) + log.encoded_len(sender);
        self.trim()
    }

    /// Forget everything from `sender`. Returns whether anything was removed.
    pub fn clear_sender(&mut self, sender: &str) -> bool {
        match self.senders.remove(sender) {
            Some(log) => {
                self.body_len -= log.encoded_len(sender);
                true
            },
            None => false,
        }
    }

    /// Drop the oldest entry of each sender in turn until the document fits.
    fn trim(&mut self) -> usize {
        let mut removed = 0;
        while self.serialized_len() > self.cap {
            let mut progressed = false;
            let frame = 2 + self.senders.len().saturating_sub(1);
            for (name, log) in &mut self.senders {
                let before = log.encoded_len(name);
                if log.pop_oldest().is_none() {
                    continue;
                }
                removed += 1;
                progressed = true;
                self.body_len = self.body_len - before + log.encoded_len(name);
                if frame + self.body_len <= self.cap {
                    break;
                }
            }

            if !progressed {
                // Only empty sender keys remain.
                self.senders.clear();
                self.body_len = 0;
                break;
            }
        }

        if removed > 0 {
            tracing::info!(removed, size = self.serialized_len(), cap = self.cap, "trimmed chatlog");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn encoded(log: &Chatlog) -> usize {
        serde_json::to_vec(&log.snapshot()).unwrap().len()
    }

    #[test]
    fn parses_public_message() {
        let msg = parse_chat_message("From Bob: Hello there", "me").unwrap();
        assert_eq!(
            msg,
            ChatMessage { sender: "Bob".into(), recipient: None, message: "Hello there".into() }
        );
    }

    #[test]
    fn resolves_you_recipient() {
        let msg = parse_chat_message("from Ann (to You): hi", "nate").unwrap();
        assert_eq!(msg.recipient.as_deref(), Some("nate"));
        let msg = parse_chat_message("From Ann (to Bob): hi", "nate").unwrap();
        assert_eq!(msg.recipient.as_deref(), Some("Bob"));
    }

    #[test]
    fn non_chat_lines_do_not_parse() {
        assert!(parse_chat_message("Welcome!", "me").is_none());
        assert!(parse_chat_message("From Bob:", "me").is_none());
    }

    #[test]
    fn entry_format() {
        let time = FixedOffset::east_opt(3600).unwrap().with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_entry(&time, "hi"), "[2025-01-02 03:04:05] hi");
    }

    #[test]
    fn json_length_matches_serde() {
        for s in ["", "plain", "quote\"back\\slash", "tab\tnl\nbell\u{7}", "░▒▓ é", "\u{1f}\u{7f}"] {
            assert_eq!(json_str_len(s), serde_json::to_string(s).unwrap().len(), "{s:?}");
        }
    }

    #[test]
    fn tracked_size_matches_serialization() {
        let mut log = Chatlog::new(DEFAULT_CHATLOG_CAP);
        assert_eq!(log.serialized_len(), encoded(&log));
        log.append("Bob", "[2025-01-01 00:00:00] one".into());
        log.append("Bob", "[2025-01-01 00:00:01] two".into());
        log.append("Ann", "[2025-01-01 00:00:02] \"quoted\"".into());
        assert_eq!(log.serialized_len(), encoded(&log));
        log.clear_sender("Bob");
        assert_eq!(log.serialized_len(), encoded(&log));
    }

    #[test]
    fn append_keeps_arrival_order() {
        let mut log = Chatlog::default();
        log.append("Bob", "a".into());
        log.append("Bob", "b".into());
        assert_eq!(log.messages("Bob"), vec!["a", "b"]);
        assert!(log.messages("Nobody").is_empty());
    }

    #[test]
    fn trims_oldest_round_robin() {
        let mut log = Chatlog::new(usize::MAX);
        log.append("Ann", "a1".into());
        log.append("Ann", "a2".into());
        log.append("Bob", "b1".into());
        log.append("Bob", "b2".into());
        let full = log.serialized_len();

        // Cap just below the current size: one removal is enough.
        let mut capped = Chatlog::from_snapshot(log.snapshot(), full - 1);
        assert_eq!(capped.messages("Ann"), vec!["a2"]);
        assert_eq!(capped.messages("Bob"), vec!["b1", "b2"]);
        assert!(capped.serialized_len() <= full - 1);

        let removed = capped.append("Bob", "b3".into());
        assert!(removed >= 1);
        assert!(capped.serialized_len() <= capped.cap());
        assert_eq!(capped.serialized_len(), encoded(&capped));
    }

    #[test]
    fn running_size_matches_serialization() {
        let mut log = Chatlog::new(60);
        let steps: [(&str, &str); 6] = [
            ("Ann", "first"),
            ("Bob", "quote \" and \\ slash"),
            ("Ann", "second"),
            ("Céline", "tab\there"),
            ("Bob", "again"),
            ("Ann", "third"),
        ];
        for (sender, entry) in steps {
            log.append(sender, entry.into());
            assert_eq!(log.serialized_len(), encoded(&log));
            assert!(log.serialized_len() <= 60);
        }

        log.clear_sender("Bob");
        assert_eq!(log.serialized_len(), encoded(&log));
        log.clear_sender("nobody");
        assert_eq!(log.serialized_len(), encoded(&log));
    }

    #[test]
    fn tiny_cap_empties_the_log() {
        let mut log = Chatlog::new(2);
        log.append("Ann", "hello".into());
        assert!(log.is_empty());
        assert_eq!(log.serialized_len(), 2);
    }

    #[test]
    fn clear_sender() {
        let mut log = Chatlog::default();
        log.append("Ann", "x".into());
        assert!(log.clear_sender("Ann"));
        assert!(!log.clear_sender("Ann"));
        assert_eq!(log.senders().count(), 0);
    }
}
