// src/supervisor/command.rs

//! The shell command that gets (re)launched on every change.

use std::fmt;

use crate::errors::{LivewatchError, Result};

/// Capacity of a [`ShellCommand`], in bytes.
///
/// A command must be strictly shorter than this.
pub const MAX_COMMAND_LEN: usize = 1024;

/// A validated, bounded shell command line.
///
/// Set once from configuration and read-only afterwards. It is passed to the
/// interpreter verbatim (`sh -c <command>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand(String);

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Result<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(LivewatchError::EmptyCommand);
        }
        if command.len() >= MAX_COMMAND_LEN {
            return Err(LivewatchError::CommandTooLong {
                len: command.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        Ok(Self(command))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpreter and arguments used to run this command.
    pub fn argv(&self) -> [&str; 3] {
        ["sh", "-c", &self.0]
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShellCommand {
    type Error = LivewatchError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}
