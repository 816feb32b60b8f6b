//! Virtual environment for simulation.
//!
//! Monotonic time is tokio's clock, which turmoil drives. Wall-clock time is a
//! fixed start moment plus the virtual time elapsed since the environment was
//! created, so timestamps are reproducible run to run.

use std::time::Duration;

use bbslink_core::env::Environment;
use chrono::{DateTime, FixedOffset, TimeZone};
use tokio::time::Instant;

/// 2025-01-01 00:00:00 UTC.
const DEFAULT_START_SECS: i64 = 1_735_689_600;

/// Environment backed by the simulated clock.
#[derive(Debug, Clone)]
pub struct SimEnv {
    origin: Instant,
    start: DateTime<FixedOffset>,
}

impl SimEnv {
    /// Environment whose wall clock starts at 2025-01-01 00:00:00 UTC.
    ///
    /// Must be called inside a simulation or tokio runtime.
    pub fn new() -> Self {
        let start = FixedOffset::east_opt(0)
            .and_then(|utc| utc.timestamp_opt(DEFAULT_START_SECS, 0).single())
            .unwrap_or_default();
        Self::starting_at(start)
    }

    /// Environment whose wall clock starts at `start`.
    pub fn starting_at(start: DateTime<FixedOffset>) -> Self {
        Self { origin: Instant::now(), start }
    }

    /// Virtual time since creation.
    pub fn elapsed(&self) -> Duration {
        Instant::now() - self.origin
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local_time(&self) -> DateTime<FixedOffset> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or_default();
        self.start + elapsed
    }
}
