// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LivewatchError, Result};
use crate::supervisor::ShellCommand;

/// Largest accepted debounce window.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(60 * 60);

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LivewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let command = validate_command(&raw)?;
        ensure_has_patterns(&raw)?;
        let debounce = validate_debounce(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.watch,
            command,
            debounce,
            raw.run.initial_run,
        ))
    }
}

fn validate_command(cfg: &RawConfigFile) -> Result<ShellCommand> {
    let command = cfg.run.command.clone().unwrap_or_default();
    ShellCommand::new(command)
}

fn ensure_has_patterns(cfg: &RawConfigFile) -> Result<()> {
    let any_pattern = cfg.watch.patterns.iter().any(|p| !p.trim().is_empty());
    if !any_pattern && !cfg.watch.watch_cwd {
        return Err(LivewatchError::NoPatterns);
    }
    Ok(())
}

fn validate_debounce(cfg: &RawConfigFile) -> Result<Duration> {
    let debounce = Duration::from_millis(cfg.run.debounce_ms);
    if debounce > MAX_DEBOUNCE {
        return Err(LivewatchError::ConfigError(format!(
            "[run].debounce_ms must be at most {} (got {})",
            MAX_DEBOUNCE.as_millis(),
            cfg.run.debounce_ms
        )));
    }
    Ok(debounce)
}
