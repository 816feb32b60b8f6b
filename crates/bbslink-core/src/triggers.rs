//! Automation triggers.
//!
//! A trigger pairs a pattern with a response. Every active trigger whose
//! pattern appears in a plain line (case-insensitively) fires, in configured
//! order.

use serde::{Deserialize, Serialize};

/// One pattern and its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Substring to look for
    #[serde(rename = "trigger")]
    pub pattern: String,
    /// Text sent when the pattern matches
    pub response: String,
}

impl Trigger {
    /// Trigger with surrounding whitespace trimmed from both fields.
    pub fn new(pattern: impl AsRef<str>, response: impl AsRef<str>) -> Self {
        Self {
            pattern: pattern.as_ref().trim().to_string(),
            response: response.as_ref().trim().to_string(),
        }
    }

    /// A trigger with an empty pattern never fires.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.pattern.trim().is_empty()
    }
}

/// Ordered list of triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet {
    triggers: Vec<Trigger>,
    /// Lowercased patterns, parallel to `triggers`.
    lowered: Vec<String>,
}

impl TriggerSet {
    /// Set from a list, order preserved.
    #[must_use]
    pub fn new(triggers: Vec<Trigger>) -> Self {
        let lowered = triggers.iter().map(|t| t.pattern.trim().to_lowercase()).collect();
        Self { triggers, lowered }
    }

    /// Configured triggers, in order.
    #[must_use]
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Number of configured triggers, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// No triggers configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Append one trigger.
    pub fn push(&mut self, trigger: Trigger) {
        self.lowered.push(trigger.pattern.trim().to_lowercase());
        self.triggers.push(trigger);
    }

    /// Responses of every active trigger found in `stripped`.
    #[must_use]
    pub fn evaluate(&self, stripped: &str) -> Vec<String> {
        let line = stripped.to_lowercase();
        self.triggers
            .iter()
            .zip(&self.lowered)
            .filter(|(trigger, pattern)| trigger.is_active() && line.contains(pattern.as_str()))
            .map(|(trigger, _)| trigger.response.clone())
            .collect()
    }
}
