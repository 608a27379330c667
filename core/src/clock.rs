//! Timestamp source for completion times.

use chrono::{SecondsFormat, Utc};

/// Produces ISO-8601 UTC timestamps, e.g. `2024-05-01T10:00:00.000Z`.
pub trait Clock {
    fn now(&self) -> String;
}

/// Wall-clock time via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}
