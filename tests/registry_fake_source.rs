// tests/registry_fake_source.rs
//
// Registry and dispatcher behaviour that depends on how the kernel hands out
// watch descriptors.

mod common;
use crate::common::{FakeWatchSource, init_tracing};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use livewatch::errors::LivewatchError;
use livewatch::fs::mock::MockFileSystem;
use livewatch::supervisor::{ReloadContext, reload_channel};
use livewatch::watch::{Dispatch, Dispatcher, EventRecord, ExclusionFilter, WatchHandle, WatchRegistry};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn modify(handle: WatchHandle, name: Option<&str>) -> EventRecord {
    EventRecord {
        handle,
        mask: libc::IN_MODIFY,
        cookie: 0,
        name: name.map(str::to_string),
    }
}

#[test]
fn reused_descriptor_dispatches_to_the_new_path() {
    init_tracing();
    let source = FakeWatchSource::new();
    let mut registry = WatchRegistry::new();

    let old = registry.register(&source, 0, "/w/old", true).unwrap();
    assert!(registry.unregister(&source, old));
    let new = registry.register(&source, 1, "/w/new", true).unwrap();
    assert_eq!(old, new);
    assert_eq!(source.removed(), vec![old]);
    assert_eq!(source.live_paths(), vec![PathBuf::from("/w/new")]);

    let (trigger, _requests) = reload_channel();
    let mut d = Dispatcher::new(
        source,
        registry,
        ExclusionFilter::default(),
        Arc::new(ReloadContext::default()),
        trigger,
    );

    assert_eq!(
        d.handle(&modify(new, Some("f.rs")), Instant::now()),
        Dispatch::Reload { path: "/w/new/f.rs".into() }
    );
}

#[test]
fn build_dedups_and_skips_exclusions() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/w/src");
    fs.add_file("/w/main.rs", "");
    let source = FakeWatchSource::new();
    let patterns = strings(&["/w/src", "/w/gen", "/w/main.rs", "/w/src"]);

    let registry =
        WatchRegistry::build(&source, &fs, &patterns, &ExclusionFilter::new(["/w/gen"])).unwrap();

    let watched: Vec<_> = registry.entries().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(watched, vec!["/w/src", "/w/main.rs"]);
    assert_eq!(registry.active_count(), 2);
    assert_eq!(
        source.live_paths(),
        vec![PathBuf::from("/w/src"), PathBuf::from("/w/main.rs")]
    );
}

#[test]
fn build_stops_at_the_first_unwatchable_path() {
    init_tracing();
    let fs = MockFileSystem::new();
    let source = FakeWatchSource::new().missing("/w/gone");
    let patterns = strings(&["/w/a", "/w/gone", "/w/b"]);

    let err = WatchRegistry::build(&source, &fs, &patterns, &ExclusionFilter::default()).unwrap_err();

    assert!(matches!(err, LivewatchError::Watch { ref path, .. } if path == "/w/gone"));
    assert_eq!(source.live_paths(), vec![PathBuf::from("/w/a")]);
}

#[test]
fn excluded_child_removes_the_directory_watch_from_the_source() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/w");
    let source = FakeWatchSource::new();
    let filter = ExclusionFilter::new(["/w/secret"]);
    let registry = WatchRegistry::build(&source, &fs, &strings(&["/w"]), &filter).unwrap();
    let handle = registry.entries()[0].handle;

    let (trigger, _requests) = reload_channel();
    let mut d = Dispatcher::new(source, registry, filter, Arc::new(ReloadContext::default()), trigger.clone());

    assert_eq!(
        d.handle(&modify(handle, Some("secret")), Instant::now()),
        Dispatch::Excluded { path: "/w/secret".into(), removed: true }
    );
    assert_eq!(d.source().removed(), vec![handle]);
    assert!(d.source().live_paths().is_empty());
    assert_eq!(trigger.requested(), 0);
}
