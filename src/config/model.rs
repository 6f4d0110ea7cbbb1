// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::supervisor::ShellCommand;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// patterns = ["src", "templates/*.html"]
/// exclude = ["src/generated"]
///
/// [run]
/// command = "cargo run"
/// debounce_ms = 1000
/// ```
///
/// All sections are optional and have reasonable defaults. Command-line
/// arguments are merged into this before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub run: RunSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Files, directories or globs to watch, relative to the working directory.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Paths or globs whose exact expansion is never watched.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Also watch the working directory.
    #[serde(default)]
    pub watch_cwd: bool,

    /// Descend into watched directories.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Apply the built-in exclusion list.
    #[serde(default = "default_true")]
    pub default_excludes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            exclude: Vec::new(),
            watch_cwd: false,
            recursive: true,
            default_excludes: true,
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Shell command relaunched on every change.
    #[serde(default)]
    pub command: Option<String>,

    /// Minimum time between relaunches, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Launch the command once at startup.
    #[serde(default = "default_true")]
    pub initial_run: bool,
}

fn default_debounce_ms() -> u64 {
    crate::supervisor::DEFAULT_DEBOUNCE.as_millis() as u64
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            command: None,
            debounce_ms: default_debounce_ms(),
            initial_run: true,
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holding one means the
/// command fits and there is something to watch.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub command: ShellCommand,
    pub debounce: Duration,
    pub initial_run: bool,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        watch: WatchSection,
        command: ShellCommand,
        debounce: Duration,
        initial_run: bool,
    ) -> Self {
        Self {
            watch,
            command,
            debounce,
            initial_run,
        }
    }
}
