// src/errors.rs

//! Crate-wide error type and result alias.

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivewatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("command is empty")]
    EmptyCommand,

    #[error("command is too long ({len} bytes); it must be less than {max} bytes")]
    CommandTooLong { len: usize, max: usize },

    #[error("no patterns to watch")]
    NoPatterns,

    #[error("failed to add watch for {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialise inotify: {0}")]
    Inotify(#[source] std::io::Error),

    #[error("failed to allocate event buffer: {0}")]
    BufferAlloc(#[from] TryReserveError),

    #[error("failed to read inotify events: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LivewatchError>;
