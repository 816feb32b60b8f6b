//! Roster extraction and state.
//!
//! A completed banner is reduced to a set of member names which replaces the
//! previous roster wholesale. Last-seen times are kept per lowercase name and
//! survive members leaving.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ansi::strip_ansi;

#[allow(clippy::expect_used, reason = "constant pattern")]
static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Topic:\s*General Chat\s*(.*?)\s*are here with you\.")
        .expect("topic pattern is valid")
});

#[allow(clippy::expect_used, reason = "constant pattern")]
static AND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\band\b").expect("conjunction pattern is valid"));

#[allow(clippy::expect_used, reason = "constant pattern")]
static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+(?:@[A-Za-z0-9.-]+\.[A-Za-z]{2,})?\b")
        .expect("name pattern is valid")
});

/// Tokens that are banner vocabulary, never member names.
const STOPWORDS: [&str; 9] =
    ["and", "are", "here", "with", "you", "topic", "general", "channel", "majorlink"];

/// Reduce banner lines to member names.
pub fn extract_members(banner: &[String]) -> BTreeSet<String> {
    let text = strip_ansi(&banner.join(" "));
    let section = TOPIC
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map_or(text.as_str(), |m| m.as_str());
    let section = AND.replace_all(section, ",");

    NAME.find_iter(&section)
        .map(|m| m.as_str().split('@').next().unwrap_or_default())
        .filter(|name| !name.is_empty())
        .filter(|name| !STOPWORDS.contains(&name.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

/// A present member and when they were last seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    /// Name as shown in the banner
    pub name: String,
    /// Unix seconds, if ever seen
    pub last_seen: Option<i64>,
}

/// Who joined and who left in one roster replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterUpdate {
    /// Names present now but not before
    pub joined: Vec<String>,
    /// Names present before but not now
    pub left: Vec<String>,
}

impl RosterUpdate {
    /// Nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Persisted form of the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// Current member names
    pub members: Vec<String>,
    /// Lowercase name to unix seconds
    pub last_seen: BTreeMap<String, i64>,
}

/// Current members plus last-seen history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: BTreeSet<String>,
    last_seen: BTreeMap<String, i64>,
}

impl Roster {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: RosterSnapshot) -> Self {
        Self { members: snapshot.members.into_iter().collect(), last_seen: snapshot.last_seen }
    }

    /// Snapshot for persistence.
    #[must_use]
    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            members: self.members.iter().cloned().collect(),
            last_seen: self.last_seen.clone(),
        }
    }

    /// Member names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Number of members present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// No one present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `name` is present (exact match).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    /// Last-seen time for `name`, matched case-insensitively.
    #[must_use]
    pub fn last_seen(&self, name: &str) -> Option<i64> {
        self.last_seen.get(&name.to_lowercase()).copied()
    }

    /// Present members with their last-seen times.
    #[must_use]
    pub fn members(&self) -> Vec<ChatMember> {
        self.members
            .iter()
            .map(|name| ChatMember { name: name.clone(), last_seen: self.last_seen(name) })
            .collect()
    }

    /// Replace the member set wholesale and stamp everyone present with `now`.
    pub fn replace(&mut self, names: BTreeSet<String>, now: i64) -> RosterUpdate {
        let joined = names.difference(&self.members).cloned().collect();
        let left = self.members.difference(&names).cloned().collect();
        for name in &names {
            self.last_seen.insert(name.to_lowercase(), now);
        }
        self.members = names;
        RosterUpdate { joined, left }
    }
}
