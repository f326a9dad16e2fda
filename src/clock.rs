use std::time::{Duration, Instant};

use crate::error::TutorError;

/// Poll cadence for the countdown
pub const TICK_RATE_MS: u64 = 100;

pub const DEFAULT_TIME_LIMIT_SECS: u64 = 60;

/// Time limit choices offered next to the custom entry
pub const TIME_PRESETS_SECS: [u64; 4] = [30, 60, 120, 300];

/// Seconds left before `limit_secs` have passed since `start`, clamped at 0
pub fn remaining(start: Instant, limit_secs: u64, now: Instant) -> f64 {
    Duration::from_secs(limit_secs)
        .saturating_sub(now.saturating_duration_since(start))
        .as_secs_f64()
}

pub fn validate_time_limit(secs: u64) -> Result<u64, TutorError> {
    if secs == 0 {
        return Err(TutorError::InvalidConfig("time must be > 0".into()));
    }
    Ok(secs)
}

/// Parse a custom time limit typed by the user
pub fn parse_time_limit(text: &str) -> Result<u64, TutorError> {
    let secs = text.trim().parse::<u64>().map_err(|_| {
        TutorError::InvalidConfig(format!(
            "{:?} is not a valid integer number of seconds",
            text.trim()
        ))
    })?;
    validate_time_limit(secs)
}

/// Countdown over a fixed limit. `start` hands out the instant a test began;
/// the caller keeps it and asks the clock about it on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestClock {
    limit_secs: u64,
}

impl TestClock {
    pub fn new(limit_secs: u64) -> Result<Self, TutorError> {
        Ok(Self {
            limit_secs: validate_time_limit(limit_secs)?,
        })
    }

    pub fn limit_secs(&self) -> u64 {
        self.limit_secs
    }

    pub fn set_limit(&mut self, limit_secs: u64) -> Result<(), TutorError> {
        self.limit_secs = validate_time_limit(limit_secs)?;
        Ok(())
    }

    /// Marks the beginning of a test at `now`
    pub fn start(&self, now: Instant) -> Instant {
        now
    }

    /// How often the front end should poll `remaining`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(TICK_RATE_MS)
    }

    pub fn elapsed(&self, start: Instant, now: Instant) -> Duration {
        now.saturating_duration_since(start)
    }

    pub fn remaining(&self, start: Instant, now: Instant) -> f64 {
        remaining(start, self.limit_secs, now)
    }

    pub fn is_expired(&self, start: Instant, now: Instant) -> bool {
        self.elapsed(start, now) >= Duration::from_secs(self.limit_secs)
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self {
            limit_secs: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}
