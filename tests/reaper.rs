use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use pipesh::exec::{execute_pipeline, wait_for};
use pipesh::parser::parse_command_line;
use pipesh::signals::{on_child_exit, reap_terminated, record_child_exit, CHILD_EXIT_MESSAGE};
use serial_test::serial;

const MYSPIN: &str = env!("CARGO_BIN_EXE_myspin");

/// Reaps until `expected` children have been collected or time runs out.
fn reap_at_least(expected: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut reaped = 0;
    while reaped < expected && Instant::now() < deadline {
        reaped += reap_terminated();
        thread::sleep(Duration::from_millis(20));
    }
    reaped
}

#[test]
#[serial]
fn log_lines_are_appended() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");
    record_child_exit(&log).unwrap();
    record_child_exit(&log).unwrap();
    assert_eq!(fs::read_to_string(&log).unwrap(), CHILD_EXIT_MESSAGE.repeat(2));
}

#[test]
#[serial]
fn sweep_collects_every_terminated_child() {
    reap_terminated();
    let mut pids = Vec::new();
    for _ in 0..3 {
        pids.extend(execute_pipeline(parse_command_line("true &")).unwrap().pids);
    }
    assert_eq!(reap_at_least(3), 3);
    assert_eq!(reap_terminated(), 0);

    // The foreground wait treats a child the sweep already took as finished.
    for pid in pids {
        assert!(matches!(wait_for(pid), Ok(None)));
    }
}

#[test]
#[serial]
fn sweep_does_not_block_on_running_children() {
    reap_terminated();
    let execution = execute_pipeline(parse_command_line(&format!("'{}' 1 &", MYSPIN))).unwrap();
    let started = Instant::now();
    assert_eq!(reap_terminated(), 0);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(wait_for(execution.pids[0]).unwrap().is_some());
}

#[test]
#[serial]
fn child_exit_event_logs_and_reaps() {
    reap_terminated();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");
    let execution = execute_pipeline(parse_command_line("true | true &")).unwrap();
    assert_eq!(execution.pids.len(), 2);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut reaped = 0;
    while reaped < 2 && Instant::now() < deadline {
        reaped += on_child_exit(&log);
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(reaped, 2);
    assert!(fs::read_to_string(&log).unwrap().starts_with(CHILD_EXIT_MESSAGE));
}
