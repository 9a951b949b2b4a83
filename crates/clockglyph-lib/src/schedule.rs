//! Update scheduling — decides when the icon must be redrawn.
//!
//! The schedule is polled from the event loop and answers with the reason an
//! update is due, if any: first run, a settings change, a new hour/minute, or
//! a stale icon (no successful update for a while, e.g. after suspend).
//! Failed updates back off exponentially so a broken render surface is not
//! hammered every loop iteration.

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::clock::DisplayMode;

/// Force an update when the last success is older than this.
pub const STALE_AFTER: Duration = Duration::from_secs(3 * 60);

/// Why an update is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    /// Nothing has been drawn yet.
    Initial,
    /// Settings changed since the last update.
    SettingsChanged,
    /// The displayed hour or minute rolled over.
    Boundary,
    /// No successful update within [`STALE_AFTER`].
    Stale,
}

/// Retry delays after failed updates.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Update schedule for one display mode.
#[derive(Debug)]
pub struct UpdateSchedule {
    mode: DisplayMode,
    stale_after: Duration,
    retry: RetryConfig,
    last_slot: Option<i64>,
    last_success: Option<Instant>,
    dirty: bool,
    consecutive_failures: u32,
    retry_delay: Duration,
    retry_at: Option<Instant>,
}

impl UpdateSchedule {
    pub fn new(mode: DisplayMode) -> Self {
        Self::with_config(mode, STALE_AFTER, RetryConfig::default())
    }

    pub fn with_config(mode: DisplayMode, stale_after: Duration, retry: RetryConfig) -> Self {
        Self {
            mode,
            stale_after,
            retry_delay: retry.initial_delay,
            retry,
            last_slot: None,
            last_success: None,
            dirty: false,
            consecutive_failures: 0,
            retry_at: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Request an update on the next poll (settings changed).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.retry_at = None;
    }

    /// Whether an update is due at wall time `now_wall` / monotonic time `now`.
    pub fn poll(&self, now_wall: NaiveDateTime, now: Instant) -> Option<UpdateReason> {
        if self.retry_at.is_some_and(|at| now < at) {
            return None;
        }
        let Some(last_success) = self.last_success else {
            return Some(UpdateReason::Initial);
        };
        if self.dirty {
            return Some(UpdateReason::SettingsChanged);
        }
        if self.last_slot != Some(self.mode.slot(now_wall)) {
            return Some(UpdateReason::Boundary);
        }
        if now.saturating_duration_since(last_success) >= self.stale_after {
            return Some(UpdateReason::Stale);
        }
        None
    }

    /// Record a successful update of the icon for `slot`.
    pub fn record_success(&mut self, slot: i64, now: Instant) {
        self.last_slot = Some(slot);
        self.last_success = Some(now);
        self.dirty = false;
        self.consecutive_failures = 0;
        self.retry_delay = self.retry.initial_delay;
        self.retry_at = None;
    }

    /// Record a failed update and push the next attempt out.
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures += 1;
        self.retry_at = Some(now + self.retry_delay);
        let next = self.retry_delay.as_secs_f64() * self.retry.multiplier;
        self.retry_delay = Duration::from_secs_f64(next).min(self.retry.max_delay);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// When the next attempt is allowed, if the last update failed.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }
}

/// Time from `now` until the next hour or minute boundary.
pub fn until_next_boundary(mode: DisplayMode, now: NaiveDateTime) -> Duration {
    let slot = mode.slot_seconds();
    let into_slot = now.and_utc().timestamp().rem_euclid(slot);
    let remaining = Duration::from_secs((slot - into_slot) as u64);
    remaining.saturating_sub(Duration::from_nanos(now.and_utc().timestamp_subsec_nanos() as u64))
}
