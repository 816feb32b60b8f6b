//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from the system clock. Production uses
//! [`SystemEnv`]; the simulation harness supplies a virtual clock so delayed
//! sends and timestamps are reproducible.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use chrono::{DateTime, FixedOffset, Local};

/// Abstract environment providing monotonic and wall-clock time.
///
/// # Invariants
///
/// - `now()` never goes backwards within one execution context
/// - `local_time()` is the wall clock in the user's timezone; it is only used
///   for display timestamps and last-seen records, never for scheduling
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type. Production uses `std::time::Instant`.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Add<Duration, Output = Self::Instant>
        + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time with the local UTC offset.
    fn local_time(&self) -> DateTime<FixedOffset>;

    /// Current wall-clock time as unix seconds.
    fn unix_time(&self) -> i64 {
        self.local_time().timestamp()
    }
}

/// Production environment backed by the system clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn local_time(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Render a wall-clock time as the `[YYYY-MM-DD HH:MM:SS] ` prefix used for
/// chatlog entries and directed messages.
pub fn timestamp_prefix(time: &DateTime<FixedOffset>) -> String {
    time.format("[%Y-%m-%d %H:%M:%S] ").to_string()
}
