// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from disk and validate it on its own.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&crate::fs::RealFileSystem, path)?;
    ConfigFile::try_from(raw_config)
}

/// Config file picked up from the working directory when `--config` is absent.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Livewatch.toml")
}

/// Overlay command-line arguments on a file configuration.
///
/// Scalars given on the command line win; list values are concatenated with
/// the command-line entries first. Boolean switches can only turn a feature
/// on (`--watch-cwd`) or off (`--no-recursive`, ...), never undo the file.
pub fn merge_cli(mut raw: RawConfigFile, args: &CliArgs) -> RawConfigFile {
    raw.watch.patterns = args
        .patterns
        .iter()
        .cloned()
        .chain(raw.watch.patterns)
        .collect();
    raw.watch.exclude = args
        .exclude
        .iter()
        .cloned()
        .chain(raw.watch.exclude)
        .collect();

    raw.watch.watch_cwd |= args.watch_cwd;
    if args.no_recursive {
        raw.watch.recursive = false;
    }
    if args.no_default_excludes {
        raw.watch.default_excludes = false;
    }

    if let Some(command) = &args.command {
        raw.run.command = Some(command.clone());
    }
    if let Some(ms) = args.debounce_ms {
        raw.run.debounce_ms = ms;
    }
    if args.no_initial_run {
        raw.run.initial_run = false;
    }

    raw
}

/// Build the effective configuration from CLI arguments and an optional file.
///
/// An explicit `--config` must exist; the default `Livewatch.toml` is only
/// read when present.
pub fn resolve_config(args: &CliArgs, fs: &dyn FileSystem) -> Result<ConfigFile> {
    let raw = match &args.config {
        Some(path) => load_from_path(fs, path)?,
        None => {
            let default = default_config_path();
            if fs.exists(&default) {
                debug!(path = ?default, "using config file from working directory");
                load_from_path(fs, &default)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    ConfigFile::try_from(merge_cli(raw, args))
}
