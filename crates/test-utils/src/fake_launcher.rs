use std::collections::BTreeMap;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use livewatch::supervisor::{LaunchedChild, ProcessLauncher, ShellCommand};

/// One interaction with the launcher, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Launch { pid: u32, command: String },
    Terminate(u32),
}

#[derive(Debug)]
struct State {
    next_pid: u32,
    calls: Vec<Call>,
    running: BTreeMap<u32, oneshot::Sender<ExitStatus>>,
    fail_launch: bool,
    launch_delay: Duration,
    started: usize,
}

/// A launcher that never forks.
///
/// - hands out sequential pids starting at 1000
/// - records every launch and terminate call
/// - keeps each "child" running until it is terminated or [`finish`]ed
///
/// [`finish`]: FakeLauncher::finish
#[derive(Debug)]
pub struct FakeLauncher {
    state: Mutex<State>,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_pid: 1000,
                calls: Vec::new(),
                running: BTreeMap::new(),
                fail_launch: false,
                launch_delay: Duration::ZERO,
                started: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make every following launch fail like a missing shell would.
    pub fn fail_launches(&self, fail: bool) {
        self.state().fail_launch = fail;
    }

    /// Block inside every following launch for `delay`, like a slow fork.
    pub fn delay_launches(&self, delay: Duration) {
        self.state().launch_delay = delay;
    }

    /// Number of launches that have begun, including ones still in progress.
    pub fn launches_started(&self) -> usize {
        self.state().started
    }

    /// Let a running child exit on its own with `code`.
    ///
    /// Returns false if `pid` is not running.
    pub fn finish(&self, pid: u32, code: i32) -> bool {
        match self.state().running.remove(&pid) {
            Some(tx) => {
                let _ = tx.send(ExitStatus::from_raw(code << 8));
                true
            }
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn launched(&self) -> Vec<u32> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Launch { pid, .. } => Some(*pid),
                Call::Terminate(_) => None,
            })
            .collect()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Terminate(pid) => Some(*pid),
                Call::Launch { .. } => None,
            })
            .collect()
    }

    /// Pids that have neither exited nor been killed.
    pub fn running(&self) -> Vec<u32> {
        self.state().running.keys().copied().collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, command: &ShellCommand) -> io::Result<LaunchedChild> {
        let delay = {
            let mut state = self.state();
            state.started += 1;
            state.launch_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state();
        if state.fail_launch {
            return Err(io::Error::new(io::ErrorKind::NotFound, "sh: not found"));
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        state.calls.push(Call::Launch {
            pid,
            command: command.to_string(),
        });

        let (tx, rx) = oneshot::channel();
        state.running.insert(pid, tx);

        Ok(LaunchedChild {
            pid,
            exit: Box::pin(async move {
                rx.await
                    .map_err(|_| io::Error::other("fake launcher dropped"))
            }),
        })
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Terminate(pid));

        match state.running.remove(&pid) {
            Some(tx) => {
                let _ = tx.send(ExitStatus::from_raw(libc::SIGKILL));
                Ok(())
            }
            None => Err(io::Error::from_raw_os_error(libc::ESRCH)),
        }
    }
}
