//! Time sources for commit and journal timestamps

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock: each reading advances by a fixed step.
///
/// Journal timestamps have one-second resolution, so a step of at least a
/// second keeps successive operations distinct.
#[derive(Debug)]
pub struct ManualClock {
    next_ms: AtomicI64,
    step_ms: i64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self {
            next_ms: AtomicI64::new(start.timestamp_millis()),
            step_ms: step.num_milliseconds(),
        }
    }

    /// Starts at 2024-01-01T00:00:00Z and ticks one second per reading
    pub fn starting_at_epoch_2024() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            chrono::Duration::seconds(1),
        )
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.next_ms.fetch_add(self.step_ms, Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }
}
