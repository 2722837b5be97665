#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)] // Integration tests use unwrap for brevity

//! End-to-end tests for `ProcessSession` against real `sh` processes.
//!
//! Each test drives a session the way a front end does: start a command,
//! watch lifecycle events, and drain the relay once more after the process
//! finished.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;

use cmdmenu_core::shell::Shell;
use cmdmenu_core::{
    ChannelObserver, Chunk, ProcessSession, SessionError, SessionEvent, SessionOptions,
};

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

fn session_with(options: SessionOptions) -> (ProcessSession, UnboundedReceiver<SessionEvent>) {
    let (observer, events) = ChannelObserver::new();
    (ProcessSession::new(options, observer), events)
}

fn session() -> (ProcessSession, UnboundedReceiver<SessionEvent>) {
    session_with(SessionOptions::default())
}

async fn next_event(events: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("observer dropped")
}

/// Wait for `Finished`, then join the readers and drain everything.
async fn finish(
    session: &ProcessSession,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> (i32, Vec<Chunk>) {
    loop {
        if let SessionEvent::Finished { exit_code } = next_event(events).await {
            assert!(!session.is_running());
            assert!(!session.terminate().await, "process already exited");
            return (exit_code, session.relay().drain_all());
        }
    }
}

async fn wait_for_output(session: &ProcessSession, needle: &str) -> Vec<Chunk> {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        seen.extend(session.relay().drain_all());
        if seen.iter().any(|c| c.text.contains(needle)) {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("never saw {needle:?} in {seen:?}");
}

#[tokio::test]
async fn printf_lines_arrive_in_order_then_finish() {
    let (session, mut events) = session();
    session.start("printf 'a\\nb\\n'").await.unwrap();
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);

    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert_eq!(chunks, vec![Chunk::stdout("a\n"), Chunk::stdout("b\n")]);
}

#[tokio::test]
async fn streams_are_tagged_and_ordered_per_stream() {
    let (session, mut events) = session();
    session
        .start("for i in 1 2 3 4 5; do echo out$i; echo err$i 1>&2; done")
        .await
        .unwrap();

    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);

    let stdout: Vec<&str> = chunks
        .iter()
        .filter(|c| !c.is_error)
        .map(|c| c.text.as_str())
        .collect();
    let stderr: Vec<&str> = chunks
        .iter()
        .filter(|c| c.is_error)
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(stdout, ["out1\n", "out2\n", "out3\n", "out4\n", "out5\n"]);
    assert_eq!(stderr, ["err1\n", "err2\n", "err3\n", "err4\n", "err5\n"]);
}

#[tokio::test]
async fn large_output_keeps_line_order() {
    let (session, mut events) = session();
    session
        .start("i=1; while [ $i -le 2000 ]; do echo $i; i=$((i+1)); done")
        .await
        .unwrap();

    let (_, chunks) = finish(&session, &mut events).await;
    let numbers: Vec<u32> = chunks
        .iter()
        .map(|c| c.text.trim_end().parse().unwrap())
        .collect();
    assert_eq!(numbers, (1..=2000).collect::<Vec<_>>());
}

#[tokio::test]
async fn partial_final_line_is_kept() {
    let (session, mut events) = session();
    session.start("printf 'no newline'").await.unwrap();
    let (_, chunks) = finish(&session, &mut events).await;
    assert_eq!(chunks, vec![Chunk::stdout("no newline")]);
}

#[tokio::test]
async fn exit_code_and_stderr_are_plain_data() {
    let (session, mut events) = session();
    session.start("echo failing 1>&2; exit 3").await.unwrap();
    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 3);
    assert_eq!(chunks, vec![Chunk::stderr("failing\n")]);
}

#[tokio::test]
async fn running_flag_tracks_process_lifetime() {
    let (session, mut events) = session();
    assert!(!session.is_running());

    session.start("sleep 0.3").await.unwrap();
    assert!(session.is_running());
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);
    assert!(session.is_running());

    let (exit_code, _) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert!(!session.is_running());
}

#[tokio::test]
async fn send_input_reaches_blocked_reader() {
    let (session, mut events) = session();
    session
        .start("read line; echo \"got:$line\"")
        .await
        .unwrap();

    assert!(session.send_input("hello").await);
    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert_eq!(chunks, vec![Chunk::stdout("got:hello\n")]);
}

#[tokio::test]
async fn send_input_adds_exactly_one_newline() {
    let (session, mut events) = session();
    session
        .start("read a; read b; echo \"$a,$b\"")
        .await
        .unwrap();

    assert!(session.send_input("hello\n").await);
    assert!(session.send_input("world").await);
    let (_, chunks) = finish(&session, &mut events).await;
    assert_eq!(chunks, vec![Chunk::stdout("hello,world\n")]);
}

#[tokio::test]
async fn send_input_fails_after_exit() {
    let (session, mut events) = session();
    session.start("true").await.unwrap();
    finish(&session, &mut events).await;
    assert!(!session.send_input("too late").await);
}

#[tokio::test]
async fn close_input_delivers_end_of_file() {
    let (session, mut events) = session();
    session.start("cat; echo eof-seen").await.unwrap();

    assert!(session.send_input("hello").await);
    assert!(session.close_input().await);
    assert!(!session.send_input("after close").await);
    assert!(!session.close_input().await);

    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert_eq!(
        chunks,
        vec![Chunk::stdout("hello\n"), Chunk::stdout("eof-seen\n")]
    );
}

#[tokio::test]
async fn stalled_input_write_times_out() {
    let (session, mut events) = session_with(SessionOptions {
        input_timeout: Some(Duration::from_millis(100)),
        ..SessionOptions::default()
    });
    // Nobody reads stdin, so a write larger than the pipe buffer blocks.
    session.start("sleep 5").await.unwrap();
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);

    let big = "x".repeat(1 << 20);
    let started = Instant::now();
    assert!(!session.send_input(&big).await);
    assert!(started.elapsed() < Duration::from_secs(3));

    assert!(session.is_running());
    assert!(session.terminate().await);
}

#[tokio::test]
async fn readers_held_open_by_background_child_are_abandoned() {
    let (session, mut events) = session_with(SessionOptions {
        terminate_timeout: Some(Duration::from_millis(300)),
        ..SessionOptions::default()
    });
    // The shell exits at once; the background sleep keeps stdout open.
    session.start("sleep 5 & echo first").await.unwrap();
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Finished { exit_code: 0 }
    );
    wait_for_output(&session, "first").await;

    let started = Instant::now();
    session.start("echo second").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(next_event(&mut events).await, SessionEvent::Started);
    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert_eq!(chunks, vec![Chunk::stdout("second\n")]);
}

#[tokio::test]
async fn bash_builtins_are_not_launch_failures() {
    if !Path::new("/bin/bash").exists() {
        return;
    }
    let (session, mut events) = session_with(SessionOptions {
        shell: Shell::from_program("/bin/bash"),
        ..SessionOptions::default()
    });
    session
        .start("declare -x F=1; pushd / >/dev/null && echo \"$F\"")
        .await
        .unwrap();
    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert_eq!(chunks, vec![Chunk::stdout("1\n")]);
}

#[tokio::test]
async fn launch_failure_fires_no_notifications() {
    let (session, mut events) = session();
    let err = session.start("nonexistent-binary-xyz").await.unwrap_err();
    let SessionError::LaunchFailed { command, reason } = err;
    assert_eq!(command, "nonexistent-binary-xyz");
    assert!(reason.contains("not found"));
    assert!(!session.is_running());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
    assert!(session.relay().is_empty());
}

#[tokio::test]
async fn launch_failure_keeps_previous_process_alive() {
    let (session, mut events) = session();
    session.start("sleep 5").await.unwrap();
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);

    assert!(session.start("nonexistent-binary-xyz").await.is_err());
    assert!(session.is_running());
    assert!(session.terminate().await);
    assert!(!session.is_running());
}

#[tokio::test]
async fn restart_terminates_previous_process_before_new_output() {
    let (session, mut events) = session();
    session.start("echo first; sleep 30; echo never").await.unwrap();
    wait_for_output(&session, "first").await;

    let started = Instant::now();
    session.start("echo second").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(next_event(&mut events).await, SessionEvent::Started);
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Finished { exit_code: -15 }
    );
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);

    let (exit_code, chunks) = finish(&session, &mut events).await;
    assert_eq!(exit_code, 0);
    assert_eq!(chunks, vec![Chunk::stdout("second\n")]);
}

#[tokio::test]
async fn process_ignoring_sigterm_is_killed_after_timeout() {
    let (session, mut events) = session_with(SessionOptions {
        terminate_timeout: Some(Duration::from_millis(300)),
        ..SessionOptions::default()
    });
    session
        .start("trap '' TERM; echo ready; sleep 30")
        .await
        .unwrap();
    wait_for_output(&session, "ready").await;

    let started = Instant::now();
    session.start("echo replaced").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(next_event(&mut events).await, SessionEvent::Started);
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Finished { exit_code: -9 }
    );
    assert_eq!(next_event(&mut events).await, SessionEvent::Started);
    let (_, chunks) = finish(&session, &mut events).await;
    assert_eq!(chunks, vec![Chunk::stdout("replaced\n")]);
}

#[tokio::test]
async fn working_directory_is_applied() {
    let dir = tempfile::TempDir::new().unwrap();
    let (session, mut events) = session_with(SessionOptions {
        working_directory: Some(dir.path().to_path_buf()),
        ..SessionOptions::default()
    });
    session.start("pwd -P").await.unwrap();
    let (_, chunks) = finish(&session, &mut events).await;

    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text.trim_end(), expected.to_str().unwrap());
}
