// src/supervisor/state.rs

//! Shared reload bookkeeping.
//!
//! [`ReloadContext`] is the one piece of state shared between the event loop
//! thread and the supervisor. Every accessor takes the lock for the duration
//! of a field read or update only; nothing blocks while holding it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::debounce::Debouncer;

/// Snapshot of the shared reload state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadState {
    /// When the last reload was claimed or completed. `None` until the first.
    pub last_reload: Option<Instant>,
    /// Process id of the most recently launched child, if still tracked.
    pub prev_child: Option<u32>,
}

#[derive(Debug, Default)]
pub struct ReloadContext {
    state: Mutex<ReloadState>,
    debouncer: Debouncer,
}

impl ReloadContext {
    pub fn new(debouncer: Debouncer) -> Self {
        Self {
            state: Mutex::new(ReloadState::default()),
            debouncer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReloadState> {
        // The state is two plain fields; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ReloadState {
        *self.lock()
    }

    /// Debounce check and clock stamp as one decision.
    ///
    /// Returns true (and records `now`) if the debouncer allows a reload.
    /// Two callers inside the same window can never both get `true`.
    pub fn try_claim_reload(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if !self.debouncer.should_reload(state.last_reload, now) {
            return false;
        }
        state.last_reload = Some(now);
        true
    }

    pub fn previous_child(&self) -> Option<u32> {
        self.lock().prev_child
    }

    /// Record a freshly launched child together with its launch time.
    pub fn record_child(&self, pid: u32, now: Instant) {
        let mut state = self.lock();
        state.prev_child = Some(pid);
        state.last_reload = Some(now);
    }

    /// Stop tracking `pid`. Does nothing if a newer child is tracked.
    ///
    /// Returns true if `pid` was the tracked child.
    pub fn clear_child(&self, pid: u32) -> bool {
        let mut state = self.lock();
        if state.prev_child == Some(pid) {
            state.prev_child = None;
            true
        } else {
            false
        }
    }
}
