//! Process session: the lifecycle of one foreground command.
//!
//! A session runs at most one process at a time. Starting a new command
//! terminates and awaits the previous one first, so output from two commands
//! never interleaves in the relay.

mod capture;
mod observer;

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use observer::{ChannelObserver, SessionEvent, SessionObserver};

use crate::config::SessionConfig;
use crate::relay::OutputRelay;
use crate::shell::Shell;
use capture::{StdinSlot, Watch};

/// Runtime policies for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub shell: Shell,
    /// Grace period after the termination request before the process is
    /// killed. `None` waits indefinitely.
    pub terminate_timeout: Option<Duration>,
    /// Upper bound for one stdin write. `None` waits indefinitely.
    pub input_timeout: Option<Duration>,
    pub working_directory: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            shell: Shell::system(),
            terminate_timeout: Some(Duration::from_secs(5)),
            input_timeout: None,
            working_directory: None,
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            shell: config
                .shell
                .clone()
                .map_or_else(Shell::system, Shell::from_program),
            terminate_timeout: config.terminate_timeout(),
            input_timeout: config.input_timeout(),
            working_directory: config.working_directory.clone(),
        }
    }
}

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to launch `{command}`: {reason}")]
    LaunchFailed { command: String, reason: String },
}

/// Book-keeping for the process currently owned by the session.
struct LiveProcess {
    run_id: Uuid,
    pid: Option<u32>,
    stdin: StdinSlot,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<()>,
    readers: Vec<JoinHandle<()>>,
}

impl LiveProcess {
    fn request_kill(&mut self) {
        if let Some(kill) = self.kill_tx.take() {
            let _ = kill.send(());
        }
    }
}

/// Owns one external process at a time and streams its output.
pub struct ProcessSession {
    options: SessionOptions,
    relay: OutputRelay,
    observer: Arc<dyn SessionObserver>,
    running: Arc<AtomicBool>,
    current: Mutex<Option<LiveProcess>>,
}

impl ProcessSession {
    pub fn new(options: SessionOptions, observer: impl SessionObserver) -> Self {
        Self {
            options,
            relay: OutputRelay::new(),
            observer: Arc::new(observer),
            running: Arc::new(AtomicBool::new(false)),
            current: Mutex::new(None),
        }
    }

    /// Output captured from the current (and previous) processes.
    pub const fn relay(&self) -> &OutputRelay {
        &self.relay
    }

    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Whether a process is live. Flips to false when the OS reports exit.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run `command` through the shell, replacing any live process.
    ///
    /// Returns once the process is spawned and its capture tasks are running.
    /// Anything that goes wrong after that surfaces as stderr text and the
    /// exit code. When a previous process is still alive this waits for it
    /// to exit, bounded by [`SessionOptions::terminate_timeout`].
    pub async fn start(&self, command: &str) -> Result<(), SessionError> {
        self.options
            .shell
            .preflight(command, self.options.working_directory.as_deref())
            .map_err(|e| SessionError::LaunchFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            self.retire(previous).await;
        }
        *current = Some(self.spawn(command)?);
        Ok(())
    }

    /// Write one line to the live process's stdin.
    ///
    /// A newline is appended unless `text` already ends with one. Returns
    /// false without writing when no process is live, and false when the
    /// write fails or exceeds the input timeout.
    pub async fn send_input(&self, text: &str) -> bool {
        if !self.is_running() {
            return false;
        }
        let (stdin, run_id) = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(live) => (Arc::clone(&live.stdin), live.run_id),
                None => return false,
            }
        };

        let mut line = text.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let mut guard = stdin.lock().await;
        let Some(pipe) = guard.as_mut() else {
            return false;
        };
        let write = async {
            pipe.write_all(line.as_bytes()).await?;
            pipe.flush().await
        };
        let result = match self.options.input_timeout {
            Some(limit) => tokio::time::timeout(limit, write).await.unwrap_or_else(|_| {
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "stdin write timed out",
                ))
            }),
            None => write.await,
        };
        drop(guard);

        match result {
            Ok(()) => {
                debug!(%run_id, bytes = line.len(), "Forwarded input");
                true
            }
            Err(e) => {
                warn!(%run_id, error = %e, "Failed to write to stdin");
                false
            }
        }
    }

    /// Close the live process's stdin so it reads end-of-file.
    ///
    /// Returns whether an open stdin was closed. Later `send_input` calls
    /// return false.
    pub async fn close_input(&self) -> bool {
        let (stdin, run_id) = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(live) => (Arc::clone(&live.stdin), live.run_id),
                None => return false,
            }
        };
        let closed = stdin.lock().await.take().is_some();
        if closed {
            debug!(%run_id, "Closed stdin");
        }
        closed
    }

    /// Stop the live process, if any, with the same policy `start` uses.
    ///
    /// Returns whether a live process was stopped.
    pub async fn terminate(&self) -> bool {
        let mut current = self.current.lock().await;
        let Some(live) = current.take() else {
            return false;
        };
        let was_alive = self.is_running();
        self.retire(live).await;
        was_alive
    }

    fn spawn(&self, command: &str) -> Result<LiveProcess, SessionError> {
        let launch_failed = |reason: String| SessionError::LaunchFailed {
            command: command.to_string(),
            reason,
        };

        let mut cmd = self.options.shell.command(command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.options.working_directory {
            cmd.current_dir(dir);
        }
        // Own process group, so termination reaches pipelines and children.
        #[cfg(unix)]
        cmd.process_group(0);

        info!(
            command,
            shell = %self.options.shell.program().display(),
            "Spawning process"
        );
        let mut child = cmd.spawn().map_err(|e| launch_failed(e.to_string()))?;
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(launch_failed("failed to capture standard streams".into()));
        };

        let run_id = Uuid::new_v4();
        let pid = child.id();
        self.running.store(true, Ordering::SeqCst);
        self.observer.on_started();

        let readers = vec![
            tokio::spawn(capture::read_stream(
                stdout,
                false,
                self.relay.clone(),
                run_id,
            )),
            tokio::spawn(capture::read_stream(
                stderr,
                true,
                self.relay.clone(),
                run_id,
            )),
        ];
        let stdin: StdinSlot = Arc::new(Mutex::new(Some(stdin)));
        let (kill_tx, kill_rx) = oneshot::channel();
        let watcher = tokio::spawn(capture::watch_exit(Watch {
            child,
            kill_rx,
            running: Arc::clone(&self.running),
            stdin: Arc::clone(&stdin),
            observer: Arc::clone(&self.observer),
            run_id,
        }));

        info!(%run_id, ?pid, "Process started");
        Ok(LiveProcess {
            run_id,
            pid,
            stdin,
            kill_tx: Some(kill_tx),
            watcher,
            readers,
        })
    }

    /// Terminate (if alive) and await a process and its readers.
    async fn retire(&self, mut live: LiveProcess) {
        let limit = self.options.terminate_timeout;
        let run_id = live.run_id;

        if self.is_running() {
            info!(%run_id, pid = ?live.pid, "Terminating process");
            request_termination(&mut live);
            if !join_within(limit, &mut live.watcher).await {
                warn!(%run_id, pid = ?live.pid, ?limit, "Process ignored termination, killing");
                live.request_kill();
                join_within(None, &mut live.watcher).await;
            }
        } else {
            join_within(None, &mut live.watcher).await;
        }

        // A background grandchild can hold the pipes open past the exit.
        for mut reader in live.readers {
            if !join_within(limit, &mut reader).await {
                warn!(%run_id, "Output stream still open after exit, abandoning reader");
                reader.abort();
            }
        }
        debug!(%run_id, "Process retired");
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        if let Some(live) = self.current.get_mut().as_mut() {
            live.request_kill();
        }
    }
}

#[cfg(unix)]
fn request_termination(live: &mut LiveProcess) {
    use nix::sys::signal::Signal;

    let Some(pid) = live.pid else {
        live.request_kill();
        return;
    };
    if let Err(e) = signal_group(pid, Signal::SIGTERM) {
        warn!(run_id = %live.run_id, pid, error = %e, "Failed to send SIGTERM");
        live.request_kill();
    }
}

#[cfg(not(unix))]
fn request_termination(live: &mut LiveProcess) {
    live.request_kill();
}

/// Send `signal` to the process group led by `pid`.
#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> nix::Result<()> {
    let pid = i32::try_from(pid).map_err(|_| nix::errno::Errno::ESRCH)?;
    nix::sys::signal::killpg(nix::unistd::Pid::from_raw(pid), signal)
}

/// Await a session task, giving up after `limit`. Returns whether it finished.
async fn join_within(limit: Option<Duration>, handle: &mut JoinHandle<()>) -> bool {
    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, &mut *handle).await {
            Ok(joined) => joined,
            Err(_) => return false,
        },
        None => handle.await,
    };
    if let Err(e) = joined {
        warn!(error = %e, "Session task failed");
    }
    true
}
