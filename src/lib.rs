// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod supervisor;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, resolve_config};
use crate::errors::{LivewatchError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::supervisor::{
    Debouncer, ReloadContext, ShellLauncher, Supervisor, kill_previous, reload_channel,
    spawn_supervisor, stop_supervisor,
};
use crate::watch::{
    Dispatcher, ExclusionFilter, ExpandOptions, Expander, Inotify, WatchRegistry,
    spawn_event_loop,
};

/// Concrete paths derived from the configured patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPlan {
    /// Paths to register, in order.
    pub patterns: Vec<String>,
    /// Exact paths that must never cause a reload.
    pub exclude: Vec<String>,
}

/// Expand the configured watch and exclude patterns against `root`.
pub fn plan_watches(cfg: &ConfigFile, fs: &dyn FileSystem, root: &Path) -> Result<WatchPlan> {
    let expander = Expander::new(fs, root);

    let exclude = expander.expand_excludes(&cfg.watch.exclude, cfg.watch.default_excludes)?;
    let filter = ExclusionFilter::new(exclude.iter().cloned());

    let options = ExpandOptions {
        watch_cwd: cfg.watch.watch_cwd,
        recursive: cfg.watch.recursive,
    };
    let patterns = expander.expand_patterns(&cfg.watch.patterns, options, &filter)?;

    Ok(WatchPlan { patterns, exclude })
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and pattern expansion
/// - inotify registration
/// - the supervisor task (initial launch + reloads)
/// - the event loop thread
/// - Ctrl-C handling
///
/// Returns `Ok(())` on Ctrl-C, or the first fatal error from either side.
pub async fn run(args: CliArgs) -> Result<()> {
    let fs = RealFileSystem;
    let cfg = resolve_config(&args, &fs)?;
    let root = std::env::current_dir()?;
    let plan = plan_watches(&cfg, &fs, &root)?;

    if args.dry_run {
        print_dry_run(&cfg, &plan);
        return Ok(());
    }

    info!(pid = std::process::id(), root = %root.display(), "livewatch starting");

    let inotify = Inotify::new().map_err(LivewatchError::Inotify)?;
    let filter = ExclusionFilter::new(plan.exclude);
    let registry = WatchRegistry::build(&inotify, &fs, &plan.patterns, &filter)?;
    if registry.active_count() == 0 {
        return Err(LivewatchError::NoPatterns);
    }

    // Registration is complete before anything is launched.
    let ctx = Arc::new(ReloadContext::new(Debouncer::new(cfg.debounce)));
    let launcher = Arc::new(ShellLauncher);
    let (trigger, requests) = reload_channel();

    let supervisor = Supervisor::new(Arc::clone(&ctx), Arc::clone(&launcher), cfg.command);
    let mut supervisor_task = spawn_supervisor(supervisor, requests, cfg.initial_run);

    let dispatcher = Dispatcher::new(inotify, registry, filter, Arc::clone(&ctx), trigger);
    let event_loop = match spawn_event_loop(dispatcher) {
        Ok(handle) => handle,
        Err(err) => {
            // The initial launch may already have happened.
            stop_supervisor(supervisor_task, &ctx, launcher.as_ref()).await;
            return Err(err);
        }
    };
    let mut event_loop = Box::pin(event_loop.wait());

    // The supervisor handle is handed back unless its branch consumed it.
    let (outcome, supervisor_task) = tokio::select! {
        res = &mut event_loop => (res, Some(supervisor_task)),
        joined = &mut supervisor_task => {
            let res = match joined {
                // The supervisor only finishes cleanly when the loop has gone away.
                Ok(Ok(())) => event_loop.await,
                Ok(Err(err)) => Err(err),
                Err(join_err) => Err(LivewatchError::Other(anyhow!("supervisor task failed: {join_err}"))),
            };
            (res, None)
        },
        signal = tokio::signal::ctrl_c() => {
            let res = match signal {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    Ok(())
                }
                Err(err) => Err(LivewatchError::IoError(err)),
            };
            (res, Some(supervisor_task))
        },
    };

    let killed = match supervisor_task {
        Some(task) => stop_supervisor(task, &ctx, launcher.as_ref()).await,
        None => kill_previous(&ctx, launcher.as_ref()),
    };
    if let Some(pid) = killed {
        debug!(pid, "child stopped on shutdown");
    }
    if let Err(ref err) = outcome {
        warn!(error = %err, "livewatch stopping on fatal error");
    }
    outcome
}

/// Dry-run output: the effective configuration and the expanded paths.
fn print_dry_run(cfg: &ConfigFile, plan: &WatchPlan) {
    println!("livewatch dry-run");
    println!("  command = {}", cfg.command);
    println!("  debounce = {:?}", cfg.debounce);
    println!("  initial_run = {}", cfg.initial_run);
    println!("  recursive = {}", cfg.watch.recursive);
    println!();

    println!("watch ({}):", plan.patterns.len());
    for path in &plan.patterns {
        if plan.exclude.contains(path) {
            println!("  - {path} (excluded)");
        } else {
            println!("  - {path}");
        }
    }

    if !plan.exclude.is_empty() {
        println!("exclude ({}):", plan.exclude.len());
        for path in &plan.exclude {
            println!("  - {path}");
        }
    }

    debug!("dry-run complete (nothing watched or launched)");
}
