// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Expanding user patterns into concrete paths ([`expand`]).
//! - Registering one inotify watch per path ([`registry`], [`inotify`]).
//! - Decoding the kernel's event stream ([`decoder`]).
//! - Deciding, per event, whether the command should be relaunched
//!   ([`filter`], [`event_loop`]).
//!
//! It does **not** know how processes are started or stopped; it only posts
//! reload requests to the supervisor.

pub mod decoder;
pub mod event_loop;
pub mod expand;
pub mod filter;
pub mod inotify;
pub mod registry;

pub use decoder::{EventRecord, EventRecords, decode};
pub use event_loop::{Dispatch, Dispatcher, EventLoopHandle, spawn_event_loop};
pub use expand::{DEFAULT_EXCLUDES, ExpandOptions, Expander};
pub use filter::ExclusionFilter;
pub use inotify::{Inotify, WATCH_MASK, WatchHandle, WatchSource};
pub use registry::{WatchEntry, WatchRegistry};
