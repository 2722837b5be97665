//! Lifecycle notifications from a [`ProcessSession`](super::ProcessSession).

use tokio::sync::mpsc;

/// Receives lifecycle notifications.
///
/// `on_started` runs on the caller of `start`, `on_finished` on the
/// completion watcher task. Output is not delivered here; consumers drain the
/// session's relay instead.
pub trait SessionObserver: Send + Sync + 'static {
    fn on_started(&self) {}

    fn on_finished(&self, _exit_code: i32) {}
}

/// Ignores every notification.
impl SessionObserver for () {}

/// Lifecycle notification as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Finished { exit_code: i32 },
}

/// Forwards notifications over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionObserver for ChannelObserver {
    fn on_started(&self) {
        let _ = self.tx.send(SessionEvent::Started);
    }

    fn on_finished(&self, exit_code: i32) {
        let _ = self.tx.send(SessionEvent::Finished { exit_code });
    }
}
