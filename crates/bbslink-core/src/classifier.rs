//! Session classification.
//!
//! Every complete line is routed exactly once. Matching is done against the
//! ANSI-stripped, trimmed copy; the raw line travels alongside for display and
//! roster buffering.
//!
//! # Precedence
//!
//! 1. An open roster banner swallows lines until its end phrase.
//! 2. Ordered [`Rule`]s: banner start, then directed message.
//! 3. Everything else is plain.
//!
//! ```text
//! ┌──────┐  "You are in…"   ┌────────────┐
//! │ Idle │─────────────────>│ Collecting │──┐ other lines
//! └──────┘                  └────────────┘<─┘
//!    ↑  "…are here with you."     │
//!    └────────────────────────────┘
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::ansi::strip_ansi;

/// Phrase that opens a roster banner.
pub const BANNER_START: &str = "You are in";

/// Phrase that closes a roster banner.
pub const BANNER_END: &str = "are here with you.";

/// A banner with no end phrase is dropped after this many lines.
pub const MAX_BANNER_LINES: usize = 64;

#[allow(clippy::expect_used, reason = "constant pattern")]
static DIRECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^From\s+(\S+)\s+\((to you|whispered)\):\s*(.+)$")
        .expect("directed pattern is valid")
});

#[allow(clippy::expect_used, reason = "constant pattern")]
static ATTENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^From\s+\S+").expect("attention pattern is valid"));

/// Roster collection sub-state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RosterCollection {
    /// Not inside a banner
    #[default]
    Idle,
    /// Inside a banner; raw lines so far
    Collecting {
        /// Raw banner lines, in order
        lines: Vec<String>,
    },
}

/// What a line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Opened a roster banner. Carries the banner when the same line also
    /// closed it.
    RosterStart {
        /// Complete banner, if the start line contained the end phrase
        completed_banner: Option<Vec<String>>,
    },
    /// Line inside an open banner.
    RosterContinuation {
        /// Complete banner, if this line closed it
        completed_banner: Option<Vec<String>>,
    },
    /// Private message addressed to the local user.
    Directed {
        /// Sending user
        sender: String,
        /// Message body
        message: String,
    },
    /// Anything else.
    Plain,
}

impl Classification {
    /// Banner lines ready for roster extraction, if this line completed one.
    #[must_use]
    pub fn completed_banner(&self) -> Option<&[String]> {
        match self {
            Self::RosterStart { completed_banner } | Self::RosterContinuation { completed_banner } => {
                completed_banner.as_deref()
            },
            _ => None,
        }
    }

    /// Whether the line belongs to a roster banner.
    #[must_use]
    pub fn is_roster(&self) -> bool {
        matches!(self, Self::RosterStart { .. } | Self::RosterContinuation { .. })
    }
}

/// A classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// Line as received, escape sequences included
    pub raw: String,
    /// ANSI-stripped, trimmed text used for matching
    pub stripped: String,
    /// Outcome
    pub kind: Classification,
}

/// Named classification rules, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Line opens a roster banner
    BannerStart,
    /// Line is a private message to the local user
    DirectedMessage,
}

impl Rule {
    /// Rules tried, in order, when no banner is open.
    pub const ORDERED: [Rule; 2] = [Rule::BannerStart, Rule::DirectedMessage];

    /// Rule name for logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BannerStart => "banner_start",
            Self::DirectedMessage => "directed_message",
        }
    }

    fn matches(self, stripped: &str) -> Option<RuleMatch> {
        match self {
            Self::BannerStart => stripped.starts_with(BANNER_START).then_some(RuleMatch::BannerStart),
            Self::DirectedMessage => DIRECTED.captures(stripped).map(|caps| RuleMatch::Directed {
                sender: caps[1].to_string(),
                message: caps[3].to_string(),
            }),
        }
    }
}

enum RuleMatch {
    BannerStart,
    Directed { sender: String, message: String },
}

/// Whether a stripped line looks like a message from someone, which earns an
/// attention signal.
#[must_use]
pub fn wants_attention(stripped: &str) -> bool {
    ATTENTION.is_match(stripped)
}

/// Classifies lines for one connection.
#[derive(Debug, Clone, Default)]
pub struct SessionClassifier {
    roster: RosterCollection,
}

impl SessionClassifier {
    /// Classifier in [`RosterCollection::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current roster collection sub-state.
    #[must_use]
    pub fn roster_state(&self) -> &RosterCollection {
        &self.roster
    }

    /// Drop any open banner. Called when a connection ends.
    pub fn reset(&mut self) {
        self.roster = RosterCollection::Idle;
    }

    /// Classify one complete line.
    pub fn classify(&mut self, raw: &str) -> ClassifiedLine {
        let stripped = strip_ansi(raw).trim().to_string();
        let kind = self.route(raw, &stripped);
        tracing::debug!(kind = kind_name(&kind), line = %stripped, "classified line");
        ClassifiedLine { raw: raw.to_string(), stripped, kind }
    }

    fn route(&mut self, raw: &str, stripped: &str) -> Classification {
        if let RosterCollection::Collecting { lines } = &mut self.roster {
            lines.push(raw.to_string());
            if stripped.contains(BANNER_END) {
                let banner = std::mem::take(lines);
                self.roster = RosterCollection::Idle;
                return Classification::RosterContinuation { completed_banner: Some(banner) };
            }
            if lines.len() >= MAX_BANNER_LINES {
                tracing::warn!(lines = lines.len(), "roster banner never closed, abandoning");
                self.roster = RosterCollection::Idle;
            }
            return Classification::RosterContinuation { completed_banner: None };
        }

        for rule in Rule::ORDERED {
            match rule.matches(stripped) {
                Some(RuleMatch::BannerStart) => {
                    let lines = vec![raw.to_string()];
                    if stripped.contains(BANNER_END) {
                        return Classification::RosterStart { completed_banner: Some(lines) };
                    }
                    self.roster = RosterCollection::Collecting { lines };
                    return Classification::RosterStart { completed_banner: None };
                },
                Some(RuleMatch::Directed { sender, message }) => {
                    return Classification::Directed { sender, message };
                },
                None => {},
            }
        }

        Classification::Plain
    }
}

fn kind_name(kind: &Classification) -> &'static str {
    match kind {
        Classification::RosterStart { .. } => Rule::BannerStart.name(),
        Classification::RosterContinuation { .. } => "roster_continuation",
        Classification::Directed { .. } => Rule::DirectedMessage.name(),
        Classification::Plain => "plain",
    }
}
