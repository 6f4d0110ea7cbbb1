#![allow(dead_code)]

use livewatch::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(command: &str) -> Self {
        let mut config = RawConfigFile::default();
        config.run.command = Some(command.to_string());
        Self { config }
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.config.watch.patterns.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn watch_cwd(mut self, val: bool) -> Self {
        self.config.watch.watch_cwd = val;
        self
    }

    pub fn recursive(mut self, val: bool) -> Self {
        self.config.watch.recursive = val;
        self
    }

    pub fn default_excludes(mut self, val: bool) -> Self {
        self.config.watch.default_excludes = val;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.run.debounce_ms = ms;
        self
    }

    pub fn initial_run(mut self, val: bool) -> Self {
        self.config.run.initial_run = val;
        self
    }

    /// The unvalidated configuration, for tests that exercise validation.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
