// src/supervisor/debounce.rs

//! Reload debouncing.
//!
//! An editor save is often several writes (truncate, write, chmod, rename).
//! Only the first change inside the window relaunches the command.

use std::time::{Duration, Instant};

/// Default minimum interval between two reloads.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    threshold: Duration,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// True iff no reload happened yet, or strictly more than the threshold
    /// has elapsed since `last`.
    pub fn should_reload(&self, last: Option<Instant>, now: Instant) -> bool {
        match last {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.threshold,
        }
    }
}
