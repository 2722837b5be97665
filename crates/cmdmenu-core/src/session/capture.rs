//! Tasks spawned per process: one reader per output stream and the
//! completion watcher that owns the child.

use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::observer::SessionObserver;
use crate::relay::{Chunk, OutputRelay};

/// Stdin of the live process; emptied by the watcher once the process exits.
pub(super) type StdinSlot = Arc<Mutex<Option<ChildStdin>>>;

const fn stream_name(is_error: bool) -> &'static str {
    if is_error { "stderr" } else { "stdout" }
}

/// Push every line of `stream` into `relay` until end-of-stream.
///
/// Lines keep their terminator; a final line without one is still pushed.
pub(super) async fn read_stream<R>(stream: R, is_error: bool, relay: OutputRelay, run_id: Uuid)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut lines = 0usize;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                relay.push(Chunk::new(String::from_utf8_lossy(&buf), is_error));
                lines += 1;
            }
            Err(e) => {
                warn!(%run_id, stream = stream_name(is_error), error = %e, "Output read failed");
                break;
            }
        }
    }
    debug!(%run_id, stream = stream_name(is_error), lines, "Output reader finished");
}

/// Everything the completion watcher needs, moved into its task.
pub(super) struct Watch {
    pub child: Child,
    pub kill_rx: oneshot::Receiver<()>,
    pub running: Arc<AtomicBool>,
    pub stdin: StdinSlot,
    pub observer: Arc<dyn SessionObserver>,
    pub run_id: Uuid,
}

/// Wait for the child to exit, or kill it when asked, then publish the exit.
pub(super) async fn watch_exit(watch: Watch) {
    let Watch {
        mut child,
        mut kill_rx,
        running,
        stdin,
        observer,
        run_id,
    } = watch;
    let pid = child.id();

    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut kill_rx => {
            warn!(%run_id, ?pid, "Killing process");
            kill_group(pid, run_id);
            if let Err(e) = child.kill().await {
                warn!(%run_id, ?pid, error = %e, "Failed to kill process");
            }
            child.wait().await
        }
    };

    let exit_code = match status {
        Ok(status) => exit_code(status),
        Err(e) => {
            error!(%run_id, ?pid, error = %e, "Failed to wait for process");
            -1
        }
    };

    stdin.lock().await.take();
    running.store(false, Ordering::SeqCst);
    info!(%run_id, ?pid, exit_code, "Process exited");
    observer.on_finished(exit_code);
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>, run_id: Uuid) {
    let Some(pid) = pid else { return };
    if let Err(e) = super::signal_group(pid, nix::sys::signal::Signal::SIGKILL) {
        debug!(%run_id, pid, error = %e, "Failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>, _run_id: Uuid) {}

/// The exit code, `-signal` for a signal death on Unix, or -1.
pub(super) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
