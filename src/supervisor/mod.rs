// src/supervisor/mod.rs

//! Process supervision.
//!
//! A reload kills the tracked child (if any), launches the command again and
//! records the new child. Reload requests arrive from the event loop thread
//! over a single-slot channel: requests posted while a reload is in progress
//! collapse into one, and posting never blocks.
//!
//! - [`command`] holds the bounded shell command.
//! - [`debounce`] decides whether enough time has passed since the last reload.
//! - [`state`] is the lock-protected bookkeeping shared with the event loop.
//! - [`launcher`] abstracts spawning and signalling processes.

pub mod command;
pub mod debounce;
pub mod launcher;
pub mod state;

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{LivewatchError, Result};

pub use command::{MAX_COMMAND_LEN, ShellCommand};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use launcher::{LaunchedChild, ProcessLauncher, ShellLauncher};
pub use state::{ReloadContext, ReloadState};

/// Sending half of the reload channel, owned by the event loop.
#[derive(Debug, Clone)]
pub struct ReloadTrigger {
    tx: watch::Sender<u64>,
}

/// Receiving half of the reload channel, owned by the supervisor task.
#[derive(Debug)]
pub struct ReloadRequests {
    rx: watch::Receiver<u64>,
}

/// Create a connected trigger / request pair.
pub fn reload_channel() -> (ReloadTrigger, ReloadRequests) {
    let (tx, rx) = watch::channel(0u64);
    (ReloadTrigger { tx }, ReloadRequests { rx })
}

impl ReloadTrigger {
    /// Post a reload request. Never blocks; works from any thread.
    pub fn request(&self) {
        self.tx.send_modify(|n| *n = n.wrapping_add(1));
    }

    /// Total number of requests posted so far.
    pub fn requested(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl ReloadRequests {
    /// Wait for the next request. Returns false once every trigger is gone.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Result of one successful reload.
#[derive(Debug)]
pub struct Reloaded {
    /// The previous child that was signalled, if any.
    pub killed: Option<u32>,
    /// Pid of the newly launched child.
    pub pid: u32,
    /// Completes when the new child exits; yields its status if it could be reaped.
    pub waiter: JoinHandle<Option<ExitStatus>>,
}

/// Kills the previous child and launches its replacement.
pub struct Supervisor<L: ProcessLauncher + 'static> {
    ctx: Arc<ReloadContext>,
    launcher: Arc<L>,
    command: ShellCommand,
}

impl<L: ProcessLauncher + 'static> std::fmt::Debug for Supervisor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("command", &self.command)
            .field("state", &self.ctx.snapshot())
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher + 'static> Supervisor<L> {
    pub fn new(ctx: Arc<ReloadContext>, launcher: Arc<L>, command: ShellCommand) -> Self {
        Self {
            ctx,
            launcher,
            command,
        }
    }

    pub fn context(&self) -> &Arc<ReloadContext> {
        &self.ctx
    }

    /// Kill the tracked child, launch the command, track the new child.
    ///
    /// Must be called from within a Tokio runtime: the new child is reaped by
    /// a detached task. A launch failure is fatal and returned as
    /// [`LivewatchError::Spawn`].
    pub fn reload(&self) -> Result<Reloaded> {
        info!(command = %self.command, "reloading");

        let killed = kill_previous(&self.ctx, self.launcher.as_ref());

        let LaunchedChild { pid, exit } =
            self.launcher
                .launch(&self.command)
                .map_err(|source| LivewatchError::Spawn {
                    command: self.command.to_string(),
                    source,
                })?;

        self.ctx.record_child(pid, Instant::now());
        info!(pid, "launched child process");

        // Reaping happens outside the lock; only the final bookkeeping locks.
        let ctx = Arc::clone(&self.ctx);
        let waiter = tokio::spawn(async move {
            let status = exit.await;
            ctx.clear_child(pid);
            match status {
                Ok(status) => {
                    report_exit(pid, status);
                    Some(status)
                }
                Err(err) => {
                    warn!(pid, error = %err, "failed to wait for child process");
                    None
                }
            }
        });

        Ok(Reloaded {
            killed,
            pid,
            waiter,
        })
    }
}

/// Send the kill signal to the tracked child, if there is one.
///
/// The tracked identity is cleared only when the signal was delivered.
/// Returns the pid that was signalled.
pub fn kill_previous<L: ProcessLauncher + ?Sized>(
    ctx: &ReloadContext,
    launcher: &L,
) -> Option<u32> {
    let pid = ctx.previous_child()?;

    match launcher.terminate(pid) {
        Ok(()) => {
            info!(pid, "killed previous child process");
            ctx.clear_child(pid);
            Some(pid)
        }
        Err(err) => {
            debug!(pid, error = %err, "previous child not signalled; assuming it already exited");
            None
        }
    }
}

/// Stop the supervisor task, then kill whatever child it left behind.
///
/// A reload runs synchronously inside the task, so `abort` alone cannot
/// interrupt one that is mid-launch. Awaiting the task first guarantees the
/// child it launched has been recorded before the kill reads the state.
pub async fn stop_supervisor<L: ProcessLauncher + ?Sized>(
    task: JoinHandle<Result<()>>,
    ctx: &ReloadContext,
    launcher: &L,
) -> Option<u32> {
    task.abort();
    if let Err(err) = task.await {
        if err.is_panic() {
            warn!(error = %err, "supervisor task panicked");
        }
    }
    kill_previous(ctx, launcher)
}

fn report_exit(pid: u32, status: ExitStatus) {
    if status.success() {
        debug!(pid, "child process exited successfully");
    } else if let Some(code) = status.code() {
        warn!(pid, exit_code = code, "child process exited with non-zero status");
    } else if let Some(signal) = status.signal() {
        debug!(pid, signal, "child process terminated by signal");
    }
}

/// Spawn the supervisor task.
///
/// With `initial_run` the command is launched once right away. Afterwards
/// every request on `requests` triggers one reload. The task ends with `Ok`
/// when the trigger side is dropped, or with the first fatal error.
pub fn spawn_supervisor<L: ProcessLauncher + 'static>(
    supervisor: Supervisor<L>,
    mut requests: ReloadRequests,
    initial_run: bool,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        info!("supervisor started");

        if initial_run {
            supervisor.reload()?;
        }

        while requests.next().await {
            supervisor.reload()?;
        }

        info!("supervisor finished (trigger channel closed)");
        Ok(())
    })
}
