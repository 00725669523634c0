//! Time source shared by the fetch pipeline and the update scheduler.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Instant;

pub trait Clock: Send + Sync {
    /// Wall-clock time, used for scheduling decisions.
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic reading used to time a single HTTP exchange.
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant. Hop durations measured with it are always zero.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    instant: Instant,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            instant: Instant::now(),
        }
    }

    /// Falls back to the unix epoch for out-of-range timestamps.
    pub fn at_timestamp(ts: i64) -> Self {
        Self::new(Utc.timestamp_opt(ts, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn monotonic(&self) -> Instant {
        self.instant
    }
}
