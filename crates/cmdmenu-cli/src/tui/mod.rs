//! Two-thread TUI orchestration.
//!
//! Terminal I/O runs on a dedicated OS thread; the process session and its
//! capture tasks stay on the tokio runtime. Communication via
//! `tokio::sync::mpsc` channels.

mod input;

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cmdmenu_core::{ChannelObserver, Config, ProcessSession, SessionEvent, SessionOptions};

use crate::app::{Action, App};
use crate::ui;

/// Terminal events forwarded from the UI reader thread.
pub enum TermEvent {
    Key(crossterm::event::KeyEvent),
    Resize(u16, u16),
}

/// Run the interactive menu.
///
/// Enters raw mode, spawns a dedicated terminal reader thread, and runs the
/// main `select!` loop until the user quits. Any running process is stopped
/// before the terminal is restored.
pub async fn run(config: &Config, options: SessionOptions) -> anyhow::Result<()> {
    let (observer, mut session_rx) = ChannelObserver::new();
    let session = ProcessSession::new(options, observer);

    // 1. Enter raw mode, create terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 2. Channels + cancellation token
    let cancel = CancellationToken::new();
    let (term_tx, mut term_rx) = tokio::sync::mpsc::channel::<TermEvent>(64);

    // 3. Spawn dedicated OS thread for crossterm::event::read()
    let cancel_clone = cancel.clone();
    let ui_thread = std::thread::spawn(move || {
        loop {
            if cancel_clone.is_cancelled() {
                break;
            }
            // Poll with 50ms timeout so we can check cancellation
            if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) => {
                        // Windows emits Press + Release per keystroke
                        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            continue;
                        }
                        if term_tx.blocking_send(TermEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Resize(w, h)) => {
                        if term_tx.blocking_send(TermEvent::Resize(w, h)).is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    });

    let mut app = App::new(config);
    let mut tick = tokio::time::interval(config.ui.poll_interval());
    info!(items = app.items.len(), "Menu started");

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            _ = tick.tick() => {
                app.ingest(session.relay().drain_all());
                if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app)) {
                    break Err(e.into());
                }
            }
            Some(term_event) = term_rx.recv() => {
                let action = input::handle_term_event(&mut app, term_event);
                perform(&mut app, &session, action).await;
            }
            Some(event) = session_rx.recv() => match event {
                SessionEvent::Started => app.on_started(),
                SessionEvent::Finished { exit_code } => {
                    app.ingest(session.relay().drain_all());
                    app.on_finished(exit_code);
                }
            },
        }
        if app.should_quit {
            break Ok(());
        }
    };

    // 4. Shutdown: stop the process, then the UI thread
    if session.terminate().await {
        info!("Stopped running process on exit");
    }
    cancel.cancel();
    let _ = ui_thread.join(); // fast, <50ms due to poll timeout

    // 5. Restore terminal
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

/// Apply an [`Action`] produced by key handling to the session.
async fn perform(app: &mut App, session: &ProcessSession, action: Action) {
    match action {
        Action::None => {}
        Action::Quit => app.should_quit = true,
        Action::Run { label, command } => {
            match session.start(&command).await {
                Ok(()) => app.begin_run(&label),
                Err(e) => {
                    warn!(label, error = %e, "Launch failed");
                    app.on_launch_failed(&e.to_string());
                }
            }
        }
        Action::Send(text) => {
            if !session.send_input(&text).await {
                app.status = "Input was not delivered".to_string();
            }
        }
    }
}
