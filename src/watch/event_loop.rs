// src/watch/event_loop.rs

//! The blocking inotify loop and the per-record dispatch policy.
//!
//! The loop runs on its own OS thread and is the only owner of the inotify
//! fd and the [`WatchRegistry`]. For every decoded record it decides, in
//! order: is the event relevant, which path does it concern, is that path
//! excluded, and has the debounce window passed. Only then is a reload
//! requested from the supervisor.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::errors::{LivewatchError, Result};
use crate::supervisor::{ReloadContext, ReloadTrigger};

use super::decoder::{EventRecord, HEADER_LEN, decode};
use super::filter::ExclusionFilter;
use super::inotify::{Inotify, WATCH_MASK, WatchHandle, WatchSource};
use super::registry::WatchRegistry;

/// Number of simultaneous events the read buffer is sized for.
pub const MAX_EVENTS: usize = 1024;

/// Read buffer size: room for `MAX_EVENTS` records with short names.
pub const EVENT_BUF_LEN: usize = MAX_EVENTS * (HEADER_LEN + 16);

/// What the dispatcher did with one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// None of the subscribed event bits were set.
    Ignored,
    /// The handle is not (or no longer) registered.
    Unknown(WatchHandle),
    /// The kernel dropped the watch; the registry entry was deactivated.
    Forgotten(WatchHandle),
    /// The path is excluded; `removed` tells whether a watch was removed.
    Excluded { path: String, removed: bool },
    /// A change inside the debounce window.
    Debounced { path: String },
    /// A reload was requested for a change to `path`.
    Reload { path: String },
}

/// Applies resolution, exclusion and debounce policy to decoded records.
pub struct Dispatcher<S: WatchSource> {
    source: S,
    registry: WatchRegistry,
    filter: ExclusionFilter,
    ctx: Arc<ReloadContext>,
    trigger: ReloadTrigger,
}

impl<S: WatchSource> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<S: WatchSource> Dispatcher<S> {
    pub fn new(
        source: S,
        registry: WatchRegistry,
        filter: ExclusionFilter,
        ctx: Arc<ReloadContext>,
        trigger: ReloadTrigger,
    ) -> Self {
        Self {
            source,
            registry,
            filter,
            ctx,
            trigger,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Decide what to do with a single record received at `now`.
    pub fn handle(&mut self, record: &EventRecord, now: Instant) -> Dispatch {
        if record.is_ignored() {
            if self.registry.forget(record.handle) {
                debug!(handle = %record.handle, "kernel removed watch");
            }
            return Dispatch::Forgotten(record.handle);
        }

        if record.is_overflow() {
            warn!("inotify queue overflowed; some changes were dropped");
            return Dispatch::Ignored;
        }

        if record.mask & WATCH_MASK == 0 {
            return Dispatch::Ignored;
        }

        let Some(entry) = self.registry.resolve(record.handle) else {
            trace!(handle = %record.handle, "event for unknown watch");
            return Dispatch::Unknown(record.handle);
        };

        let base = entry.path.clone();
        // A directory watch reports on its entries; each one is checked on its own.
        let child = match (&record.name, entry.is_dir) {
            (Some(name), true) => Some(format!("{base}/{name}")),
            _ => None,
        };

        let excluded = child
            .as_deref()
            .filter(|c| self.filter.is_excluded(c))
            .or_else(|| self.filter.is_excluded(&base).then_some(base.as_str()))
            .map(str::to_string);

        if let Some(path) = excluded {
            let removed = self.registry.unregister(&self.source, record.handle);
            if removed {
                debug!(path = %path, watch = %base, "[skipping] removed watch");
            }
            return Dispatch::Excluded { path, removed };
        }

        let path = child.unwrap_or(base);

        if !self.ctx.try_claim_reload(now) {
            trace!(path = %path, "change within debounce window");
            return Dispatch::Debounced { path };
        }

        info!(path = %path, "change detected");
        self.trigger.request();
        Dispatch::Reload { path }
    }
}

/// Read and dispatch events forever.
///
/// Only returns on a fatal error (buffer allocation or read failure). The
/// dispatcher, with its registry and fd, is dropped before returning.
pub fn run_event_loop(mut dispatcher: Dispatcher<Inotify>) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(EVENT_BUF_LEN)?;
    buf.resize(EVENT_BUF_LEN, 0);

    debug!(
        watches = dispatcher.registry().active_count(),
        buffer = EVENT_BUF_LEN,
        "event loop started"
    );

    loop {
        let n = dispatcher
            .source()
            .read_events(&mut buf)
            .map_err(LivewatchError::Read)?;

        for record in decode(&buf[..n]) {
            let outcome = dispatcher.handle(&record, Instant::now());
            trace!(?record, ?outcome, "dispatched");
        }
    }
}

/// Completion handle for the event loop thread.
#[derive(Debug)]
pub struct EventLoopHandle {
    done: oneshot::Receiver<Result<()>>,
}

impl EventLoopHandle {
    /// Resolves with the loop's fatal error.
    pub async fn wait(self) -> Result<()> {
        match self.done.await {
            Ok(res) => res,
            Err(_) => Err(LivewatchError::Other(anyhow!("event loop thread panicked"))),
        }
    }
}

/// Start [`run_event_loop`] on a dedicated, named OS thread.
///
/// The thread is detached: it blocks in `read(2)` and ends with the process.
pub fn spawn_event_loop(dispatcher: Dispatcher<Inotify>) -> Result<EventLoopHandle> {
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name("livewatch-inotify".to_string())
        .spawn(move || {
            let res = run_event_loop(dispatcher);
            let _ = tx.send(res);
        })?;

    Ok(EventLoopHandle { done: rx })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::supervisor::{Debouncer, reload_channel};

    #[derive(Default)]
    struct FakeSource {
        next: RefCell<i32>,
        removed: RefCell<Vec<WatchHandle>>,
    }

    impl WatchSource for FakeSource {
        fn add_watch(&self, _path: &Path) -> io::Result<WatchHandle> {
            let mut next = self.next.borrow_mut();
            *next += 1;
            Ok(WatchHandle(*next))
        }

        fn remove_watch(&self, handle: WatchHandle) -> io::Result<()> {
            self.removed.borrow_mut().push(handle);
            Ok(())
        }
    }

    fn record(handle: WatchHandle, mask: u32, name: Option<&str>) -> EventRecord {
        EventRecord {
            handle,
            mask,
            cookie: 0,
            name: name.map(str::to_string),
        }
    }

    fn dispatcher(
        paths: &[(&str, bool)],
        exclude: &[&str],
    ) -> (Dispatcher<FakeSource>, Vec<WatchHandle>, ReloadTrigger) {
        let source = FakeSource::default();
        let mut registry = WatchRegistry::new();
        let handles = paths
            .iter()
            .enumerate()
            .map(|(i, (p, is_dir))| registry.register(&source, i, p, *is_dir).unwrap())
            .collect();
        let ctx = Arc::new(ReloadContext::new(Debouncer::new(Duration::from_secs(1))));
        let (trigger, _requests) = reload_channel();
        let d = Dispatcher::new(
            source,
            registry,
            ExclusionFilter::new(exclude.iter().copied()),
            ctx,
            trigger.clone(),
        );
        (d, handles, trigger)
    }

    #[test]
    fn file_watch_reports_the_registered_path() {
        let (mut d, h, trigger) = dispatcher(&[("/tmp/w/a.txt", false)], &[]);

        let out = d.handle(&record(h[0], libc::IN_MODIFY, None), Instant::now());
        assert_eq!(out, Dispatch::Reload { path: "/tmp/w/a.txt".into() });
        assert_eq!(trigger.requested(), 1);
    }

    #[test]
    fn directory_watch_builds_child_path() {
        let (mut d, h, _) = dispatcher(&[("/tmp/w", true)], &[]);

        let out = d.handle(&record(h[0], libc::IN_CREATE, Some("a.txt")), Instant::now());
        assert_eq!(out, Dispatch::Reload { path: "/tmp/w/a.txt".into() });
    }

    #[test]
    fn child_path_is_checked_literally() {
        // Neither "a.txt" nor "/tmp/w" is excluded, only the joined path.
        let (mut d, h, trigger) = dispatcher(&[("/tmp/w", true)], &["/tmp/w/a.txt"]);

        let out = d.handle(&record(h[0], libc::IN_MODIFY, Some("a.txt")), Instant::now());
        assert_eq!(
            out,
            Dispatch::Excluded { path: "/tmp/w/a.txt".into(), removed: true }
        );
        assert_eq!(trigger.requested(), 0);
        assert_eq!(*d.source().removed.borrow(), vec![h[0]]);
    }

    #[test]
    fn excluded_name_alone_does_not_match() {
        let (mut d, h, _) = dispatcher(&[("/tmp/w", true)], &["a.txt", "/tmp"]);

        let out = d.handle(&record(h[0], libc::IN_MODIFY, Some("a.txt")), Instant::now());
        assert_eq!(out, Dispatch::Reload { path: "/tmp/w/a.txt".into() });
    }

    #[test]
    fn excluded_watch_is_removed_and_then_unknown() {
        let (mut d, h, trigger) = dispatcher(&[("/tmp/w", true)], &["/tmp/w/a.txt"]);
        let now = Instant::now();
        let ev = record(h[0], libc::IN_MODIFY, Some("a.txt"));

        assert!(matches!(d.handle(&ev, now), Dispatch::Excluded { removed: true, .. }));
        assert_eq!(d.handle(&ev, now), Dispatch::Unknown(h[0]));
        assert_eq!(trigger.requested(), 0);
        assert_eq!(d.registry().active_count(), 0);
    }

    #[test]
    fn irrelevant_mask_is_ignored() {
        let (mut d, h, trigger) = dispatcher(&[("/tmp/w", true)], &[]);

        let out = d.handle(&record(h[0], libc::IN_ACCESS | libc::IN_OPEN, Some("a")), Instant::now());
        assert_eq!(out, Dispatch::Ignored);
        assert_eq!(trigger.requested(), 0);
    }

    #[test]
    fn unknown_handle_is_a_no_op() {
        let (mut d, _, trigger) = dispatcher(&[("/tmp/w", true)], &[]);

        let out = d.handle(&record(WatchHandle(99), libc::IN_MODIFY, None), Instant::now());
        assert_eq!(out, Dispatch::Unknown(WatchHandle(99)));
        assert_eq!(trigger.requested(), 0);
    }

    #[test]
    fn ignored_event_forgets_the_watch() {
        let (mut d, h, _) = dispatcher(&[("/tmp/w", true)], &[]);

        assert_eq!(
            d.handle(&record(h[0], libc::IN_IGNORED, None), Instant::now()),
            Dispatch::Forgotten(h[0])
        );
        assert_eq!(d.registry().active_count(), 0);
        assert!(d.source().removed.borrow().is_empty());
    }

    #[test]
    fn debounce_window_suppresses_second_change() {
        let (mut d, h, trigger) = dispatcher(&[("/tmp/w", true)], &[]);
        let t0 = Instant::now();
        let ev = record(h[0], libc::IN_MODIFY, Some("a.txt"));

        assert!(matches!(d.handle(&ev, t0), Dispatch::Reload { .. }));
        assert!(matches!(
            d.handle(&ev, t0 + Duration::from_millis(400)),
            Dispatch::Debounced { .. }
        ));
        assert!(matches!(
            d.handle(&ev, t0 + Duration::from_millis(1500)),
            Dispatch::Reload { .. }
        ));
        assert_eq!(trigger.requested(), 2);
    }
}
