// tests/config_errors.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, long_command};

use std::io::Write;

use livewatch::cli::CliArgs;
use livewatch::config::{ConfigFile, load_and_validate};
use livewatch::errors::LivewatchError;
use livewatch::run;
use livewatch::supervisor::MAX_COMMAND_LEN;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn overlong_command_in_file_is_rejected() {
    init_tracing();
    let file = write_config(&format!(
        "[watch]\npatterns = [\".\"]\n[run]\ncommand = \"{}\"\n",
        long_command(MAX_COMMAND_LEN)
    ));

    match load_and_validate(file.path()) {
        Err(LivewatchError::CommandTooLong { len, max }) => {
            assert_eq!(len, MAX_COMMAND_LEN);
            assert_eq!(max, MAX_COMMAND_LEN);
        }
        other => panic!("expected CommandTooLong, got {other:?}"),
    }
}

#[test]
fn longest_allowed_command_is_accepted() {
    init_tracing();
    let cfg = ConfigFileBuilder::new(&long_command(MAX_COMMAND_LEN - 1))
        .watch("src")
        .build();
    assert_eq!(cfg.command.as_str().len(), MAX_COMMAND_LEN - 1);
}

#[test]
fn missing_command_and_patterns_are_rejected() {
    init_tracing();
    let no_command = ConfigFileBuilder::new("   ").watch("src").raw();
    assert!(matches!(
        ConfigFile::try_from(no_command),
        Err(LivewatchError::EmptyCommand)
    ));

    let no_patterns = ConfigFileBuilder::new("make").raw();
    assert!(matches!(
        ConfigFile::try_from(no_patterns),
        Err(LivewatchError::NoPatterns)
    ));

    let cwd_only = ConfigFileBuilder::new("make").watch_cwd(true).raw();
    assert!(ConfigFile::try_from(cwd_only).is_ok());
}

#[test]
fn malformed_toml_is_a_toml_error() {
    init_tracing();
    let file = write_config("[watch\npatterns = 1");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(LivewatchError::TomlError(_))
    ));
}

#[tokio::test]
async fn run_fails_on_invalid_command_before_watching() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgs {
        patterns: vec![dir.path().to_string_lossy().into_owned()],
        command: Some(long_command(MAX_COMMAND_LEN + 10)),
        ..CliArgs::default()
    };

    let err = run(args).await.unwrap_err();
    assert!(matches!(err, LivewatchError::CommandTooLong { .. }));
}

#[tokio::test]
async fn dry_run_returns_without_launching() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("launched");
    let args = CliArgs {
        patterns: vec![dir.path().to_string_lossy().into_owned()],
        command: Some(format!("touch '{}'", marker.display())),
        dry_run: true,
        ..CliArgs::default()
    };

    run(args).await.unwrap();
    assert!(!marker.exists());
}
