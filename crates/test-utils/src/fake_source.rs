use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use livewatch::watch::{WatchHandle, WatchSource};

#[derive(Debug, Default)]
struct State {
    live: BTreeMap<i32, PathBuf>,
    removed: Vec<WatchHandle>,
    missing: BTreeSet<PathBuf>,
}

/// In-memory stand-in for an inotify instance.
///
/// Descriptors behave like the kernel's: the lowest free number is handed
/// out, and watching the same path twice returns the same descriptor.
#[derive(Debug, Default)]
pub struct FakeWatchSource {
    state: Mutex<State>,
}

impl FakeWatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make `add_watch` fail with `NotFound` for `path`.
    pub fn missing(self, path: impl Into<PathBuf>) -> Self {
        self.state().missing.insert(path.into());
        self
    }

    pub fn removed(&self) -> Vec<WatchHandle> {
        self.state().removed.clone()
    }

    pub fn live_paths(&self) -> Vec<PathBuf> {
        self.state().live.values().cloned().collect()
    }
}

impl WatchSource for FakeWatchSource {
    fn add_watch(&self, path: &Path) -> io::Result<WatchHandle> {
        let mut state = self.state();
        if state.missing.contains(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if let Some((wd, _)) = state.live.iter().find(|(_, p)| p.as_path() == path) {
            return Ok(WatchHandle(*wd));
        }

        let wd = (1..)
            .find(|wd| !state.live.contains_key(wd))
            .unwrap_or(i32::MAX);
        state.live.insert(wd, path.to_path_buf());
        Ok(WatchHandle(wd))
    }

    fn remove_watch(&self, handle: WatchHandle) -> io::Result<()> {
        let mut state = self.state();
        state.removed.push(handle);
        state
            .live
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
    }
}
