// src/config/mod.rs

//! Configuration: TOML model, loading, validation and CLI merging.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, merge_cli, resolve_config};
pub use model::{ConfigFile, RawConfigFile, RunSection, WatchSection};
