//! Login prompt detection for automated sign-in.

use std::time::Duration;

/// How long to wait after a prompt before answering it.
pub const LOGIN_SEND_DELAY: Duration = Duration::from_millis(500);

/// Which credential a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPrompt {
    /// Username prompt
    Username,
    /// Password prompt
    Password,
}

/// Detect a login prompt in a stripped plain line.
#[must_use]
pub fn detect_login_prompt(stripped: &str) -> Option<LoginPrompt> {
    let line = stripped.to_lowercase();
    if line.contains("enter your password:") {
        Some(LoginPrompt::Password)
    } else if line.contains("type it in and press enter") || line.contains("otherwise type \"new\":")
    {
        Some(LoginPrompt::Username)
    } else {
        None
    }
}
