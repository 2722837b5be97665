//! Headless (non-interactive) mode.
//!
//! Runs one command in a process session, streams its output to stdout and
//! stderr, forwards our stdin lines to it, and reports its exit code.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use cmdmenu_core::{
    ChannelObserver, Chunk, MenuItem, ProcessSession, SessionEvent, SessionOptions,
};

/// Look up a menu entry by exact label or by 1-based position among entries.
pub fn find_entry<'a>(items: &'a [MenuItem], entry: &str) -> Option<&'a MenuItem> {
    if let Some(item) = items.iter().find(|item| item.label() == Some(entry)) {
        return Some(item);
    }
    let index = entry.parse::<usize>().ok()?.checked_sub(1)?;
    items.iter().filter(|item| !item.is_separator()).nth(index)
}

/// Join `exec` arguments into one command line, quoting where needed.
pub fn command_line(args: &[String]) -> String {
    shell_words::join(args)
}

/// Map a session exit code to a process exit status the way shells do.
pub const fn process_exit_code(exit_code: i32) -> i32 {
    if exit_code < 0 {
        128_i32.saturating_add(exit_code.saturating_neg())
    } else {
        exit_code
    }
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    index: usize,
    label: &'a str,
    command: Option<&'a str>,
}

/// Write the menu as numbered entries, or as JSON.
pub fn write_menu(
    out: &mut impl Write,
    title: &str,
    items: &[MenuItem],
    json: bool,
) -> io::Result<()> {
    let entries: Vec<ListedEntry<'_>> = items
        .iter()
        .filter_map(|item| Some((item.label()?, item.command())))
        .enumerate()
        .map(|(i, (label, command))| ListedEntry {
            index: i + 1,
            label,
            command,
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        return writeln!(out);
    }

    writeln!(out, "{title}")?;
    let mut entries = entries.iter();
    for item in items {
        if item.is_separator() {
            writeln!(out, "  ----")?;
        } else if let Some(entry) = entries.next() {
            writeln!(
                out,
                "  {:>2}. {}  ({})",
                entry.index,
                entry.label,
                entry.command.unwrap_or("no command")
            )?;
        }
    }
    Ok(())
}

/// Run `command` to completion, writing its output to our stdout/stderr.
///
/// Lines typed on stdin are forwarded to the process. Ctrl+C terminates the
/// process (it runs in its own process group, so the signal reaches only us).
pub async fn run(options: SessionOptions, command: &str) -> anyhow::Result<i32> {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    // Blocking reader thread; it dies with the process.
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    stream(options, command, &mut io::stdout(), &mut io::stderr(), input_rx).await
}

/// Drive one session until its process finishes, with explicit I/O.
pub async fn stream(
    options: SessionOptions,
    command: &str,
    out: &mut impl Write,
    err: &mut impl Write,
    mut input: mpsc::UnboundedReceiver<String>,
) -> anyhow::Result<i32> {
    let (observer, mut events) = ChannelObserver::new();
    let session = ProcessSession::new(options, observer);
    session.start(command).await?;
    info!(command, "Headless run started");

    let mut input_open = true;
    let exit_code = loop {
        tokio::select! {
            () = session.relay().notified() => {
                write_chunks(out, err, session.relay().drain_all())?;
            }
            Some(event) = events.recv() => {
                if let SessionEvent::Finished { exit_code } = event {
                    break exit_code;
                }
            }
            line = input.recv(), if input_open => match line {
                Some(line) => {
                    if !session.send_input(&line).await {
                        debug!("Input dropped, process not accepting it");
                    }
                }
                None => {
                    input_open = false;
                    session.close_input().await;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, terminating process");
                session.terminate().await;
            }
        }
    };

    // Joins the output readers, so the final drain is complete.
    session.terminate().await;
    write_chunks(out, err, session.relay().drain_all())?;
    info!(exit_code, "Headless run finished");
    Ok(exit_code)
}

fn write_chunks(
    out: &mut impl Write,
    err: &mut impl Write,
    chunks: Vec<Chunk>,
) -> io::Result<()> {
    if chunks.is_empty() {
        return Ok(());
    }
    for chunk in &chunks {
        if chunk.is_error {
            err.write_all(chunk.text.as_bytes())?;
        } else {
            out.write_all(chunk.text.as_bytes())?;
        }
    }
    out.flush()?;
    err.flush()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn items() -> Vec<MenuItem> {
        vec![
            MenuItem::action("Disk", "df -h"),
            MenuItem::Separator,
            MenuItem::Action {
                label: "Broken".to_string(),
                command: None,
            },
            MenuItem::action("3", "echo labelled three"),
        ]
    }

    #[test]
    fn entries_found_by_label_then_index() {
        let items = items();
        assert_eq!(find_entry(&items, "Disk"), Some(&items[0]));
        assert_eq!(find_entry(&items, "2"), Some(&items[2]));
        // A label that looks like a number wins over the index.
        assert_eq!(find_entry(&items, "3"), Some(&items[3]));
        assert_eq!(find_entry(&items, "0"), None);
        assert_eq!(find_entry(&items, "9"), None);
        assert_eq!(find_entry(&items, "missing"), None);
    }

    #[test]
    fn exec_arguments_keep_their_quoting() {
        let args: Vec<String> = ["printf", "%s\\n", "a b", "it's"]
            .into_iter()
            .map(String::from)
            .collect();
        let line = command_line(&args);
        assert!(line.starts_with("printf "));
        assert_eq!(shell_words::split(&line).unwrap(), args);
        assert_eq!(command_line(&["ls".to_string()]), "ls");
    }

    #[test]
    fn signal_deaths_map_to_shell_status() {
        assert_eq!(process_exit_code(0), 0);
        assert_eq!(process_exit_code(3), 3);
        assert_eq!(process_exit_code(-15), 143);
        assert_eq!(process_exit_code(-9), 137);
    }

    #[test]
    fn menu_listing_numbers_actions_only() {
        let mut out = Vec::new();
        write_menu(&mut out, "Ops", &items(), false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Ops\n   1. Disk  (df -h)\n  ----\n   2. Broken  (no command)\n   3. 3  (echo labelled three)\n"
        );
    }

    #[test]
    fn menu_listing_as_json() {
        let mut out = Vec::new();
        write_menu(&mut out, "Ops", &items(), true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["label"], "Disk");
        assert_eq!(entries[0]["index"], 1);
        assert!(entries[1]["command"].is_null());
    }

    #[test]
    fn chunks_go_to_matching_writer() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_chunks(
            &mut out,
            &mut err,
            vec![Chunk::stdout("a\n"), Chunk::stderr("b\n"), Chunk::stdout("c")],
        )
        .unwrap();
        assert_eq!(out, b"a\nc");
        assert_eq!(err, b"b\n");
    }
}
