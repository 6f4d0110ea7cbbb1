// src/watch/registry.rs

//! Mapping from kernel watch descriptors back to the paths they watch.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::{LivewatchError, Result};
use crate::fs::FileSystem;

use super::filter::ExclusionFilter;
use super::inotify::{WatchHandle, WatchSource};

/// One registered watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub handle: WatchHandle,
    /// Position of the path in the pattern list it was registered from.
    pub index: usize,
    pub path: String,
    /// Whether the watched inode was a directory at registration time.
    pub is_dir: bool,
    active: bool,
}

/// Insertion-ordered list of watches plus the count of active ones.
///
/// Removed entries stay in the list but are skipped by lookups, so a
/// descriptor number the kernel hands out again never resolves to the
/// entry it used to belong to.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: Vec<WatchEntry>,
    active: usize,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            active: 0,
        }
    }

    /// Register every pattern that is not excluded.
    ///
    /// Any registration failure aborts the whole build.
    pub fn build<S: WatchSource + ?Sized>(
        source: &S,
        fs: &dyn FileSystem,
        patterns: &[String],
        filter: &ExclusionFilter,
    ) -> Result<Self> {
        let mut registry = Self::new();

        for (index, path) in patterns.iter().enumerate() {
            if filter.is_excluded(path) {
                debug!(path = %path, "[skipping] excluded at registration");
                continue;
            }
            let is_dir = fs.is_dir(Path::new(path));
            registry.register(source, index, path, is_dir)?;
        }

        info!(count = registry.active_count(), "watching files and directories");
        Ok(registry)
    }

    /// Add a kernel watch for `path` and record it.
    ///
    /// If the kernel returns a descriptor that is already active (the same
    /// inode reached through another pattern), no second entry is created.
    pub fn register<S: WatchSource + ?Sized>(
        &mut self,
        source: &S,
        index: usize,
        path: &str,
        is_dir: bool,
    ) -> Result<WatchHandle> {
        let handle = source
            .add_watch(Path::new(path))
            .map_err(|source| LivewatchError::Watch {
                path: path.to_string(),
                source,
            })?;

        if let Some(existing) = self.resolve(handle) {
            debug!(%handle, path = %path, existing = %existing.path, "path already watched");
            return Ok(handle);
        }

        debug!(%handle, path = %path, is_dir, "added watch");
        self.entries.push(WatchEntry {
            handle,
            index,
            path: path.to_string(),
            is_dir,
            active: true,
        });
        self.active += 1;
        Ok(handle)
    }

    /// Active entry for `handle`, first match wins.
    pub fn resolve(&self, handle: WatchHandle) -> Option<&WatchEntry> {
        self.entries
            .iter()
            .find(|e| e.active && e.handle == handle)
    }

    pub fn resolve_path(&self, handle: WatchHandle) -> Option<&str> {
        self.resolve(handle).map(|e| e.path.as_str())
    }

    /// Remove the kernel watch for `handle` and deactivate its entry.
    ///
    /// Returns false if the handle was unknown or already removed.
    pub fn unregister<S: WatchSource + ?Sized>(&mut self, source: &S, handle: WatchHandle) -> bool {
        let Some(path) = self.deactivate(handle) else {
            return false;
        };

        if let Err(err) = source.remove_watch(handle) {
            // The kernel may have dropped it already (path deleted).
            warn!(%handle, path = %path, error = %err, "failed to remove watch");
        }
        true
    }

    /// Deactivate `handle` without touching the kernel.
    ///
    /// Used when the kernel reports that it removed the watch itself.
    pub fn forget(&mut self, handle: WatchHandle) -> bool {
        self.deactivate(handle).is_some()
    }

    fn deactivate(&mut self, handle: WatchHandle) -> Option<String> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.active && e.handle == handle)?;
        entry.active = false;
        self.active -= 1;
        Some(entry.path.clone())
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Every entry ever registered, in registration order.
    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }
}
