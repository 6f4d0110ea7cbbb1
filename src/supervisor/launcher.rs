// src/supervisor/launcher.rs

//! Pluggable process launching.
//!
//! The supervisor talks to a `ProcessLauncher` instead of spawning processes
//! directly, so tests can swap in a fake that records launches and kills
//! without forking anything.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use super::command::ShellCommand;

/// Resolves once the launched child has exited.
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ExitStatus>> + Send + 'static>>;

/// A child that has been created but not yet reaped.
pub struct LaunchedChild {
    pub pid: u32,
    pub exit: ExitFuture,
}

impl std::fmt::Debug for LaunchedChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedChild")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how commands are started and stopped.
///
/// Production code uses [`ShellLauncher`].
pub trait ProcessLauncher: Send + Sync {
    /// Start `command` and return its pid plus a future for its exit status.
    fn launch(&self, command: &ShellCommand) -> io::Result<LaunchedChild>;

    /// Forcefully terminate `pid`.
    ///
    /// An error means the signal was not delivered (typically `ESRCH`: the
    /// process already exited).
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// Runs commands through `sh -c` with inherited stdio and kills with `SIGKILL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellLauncher;

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, command: &ShellCommand) -> io::Result<LaunchedChild> {
        let [program, flag, line] = command.argv();
        let mut cmd = Command::new(program);
        cmd.arg(flag)
            .arg(line)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("spawned child has no pid"))?;

        Ok(LaunchedChild {
            pid,
            exit: Box::pin(async move { child.wait().await }),
        })
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        // pid 0 and negative pids address process groups; never send those.
        let pid = libc::pid_t::try_from(pid)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;

        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, libc::SIGKILL) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
