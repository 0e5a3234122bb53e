//! Integration tests for the virtfuzz CLI.

use hex as _;
use rand as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing as _;
use tracing_subscriber as _;
use virtfuzz_core as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("virtfuzz")
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/e1000.json")
}

fn run(args: &[&str]) -> Output {
    Command::new(binary_path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run virtfuzz")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn run_saved_input(bytes: &[u8], extra: &[&str]) -> Output {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("input.bin");
    fs::write(&input, bytes).unwrap();
    let fixture = fixture();
    let mut args = vec![
        "-f",
        fixture.to_str().unwrap(),
        "-n",
        "e1000",
        "-i",
        input.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    run(&args)
}

#[test]
fn help_prints_usage() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage: virtfuzz"));
}

#[test]
fn missing_description_reports_missing_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("absent.json");

    let output = run(&["-f", missing.to_str().unwrap(), "-n", "e1000"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Device Name: e1000"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("device_model_file"));
    assert!(stderr.contains("does not exist!"));
}

#[test]
fn seeded_runs_are_reproducible() {
    let fixture = fixture();
    let args = ["-f", fixture.to_str().unwrap(), "-n", "e1000", "--seed", "7", "-c"];

    let first = run(&args);
    let second = run(&args);

    let report = stdout(&first);
    assert!(report.contains("Device model initialized successfully"));
    assert!(report.contains("Seed: 7"));
    assert!(report.contains("Device model initialized successfully\n\nAvailable interfaces:\n"));
    assert!(report.contains("mmio-02"));
    assert!(report.contains("[FUZZ] num_messages: "));
    assert!(matches!(first.status.code(), Some(0 | 2)));
    assert_eq!(report, stdout(&second));
    assert_eq!(first.status.code(), second.status.code());
}

#[test]
fn clean_saved_input_exits_zero() {
    // 4-byte write to the writable CTRL register
    let output = run_saved_input(&[0x00, 0x00, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04], &["-v"]);

    assert_eq!(output.status.code(), Some(0));
    let report = stdout(&output);
    assert!(report.contains("[FUZZ] num_messages: 1."));
    assert!(report.contains("WRITE mmio-00#0 offset=0x0 len=4 payload=01020304"));
    assert!(report.contains("[REPLAY] replayed: 1, skipped: 0, faults: 0."));
}

#[test]
fn model_fault_stops_replay_and_exits_two() {
    // write to read-only STATUS, then read write-only EERD
    let input = [
        0x00, 0x08, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04, //
        0x00, 0x14, 0x00, 0x05,
    ];

    let stop = run_saved_input(&input, &[]);
    assert_eq!(stop.status.code(), Some(2));
    let report = stdout(&stop);
    assert!(report.contains("[REPLAY] replayed: 1, skipped: 1, faults: 1."));
    assert!(report.contains("[FAULT] message 0: WRITE #0 offset=0x8 payload=01020304"));
    assert!(report.contains("write to read-only register at 0x8"));

    let keep_going = run_saved_input(&input, &["--continue"]);
    assert_eq!(keep_going.status.code(), Some(2));
    let report = stdout(&keep_going);
    assert!(report.contains("[REPLAY] replayed: 2, skipped: 0, faults: 2."));
    assert!(report.contains("read from write-only register at 0x14"));
}

#[test]
fn unknown_option_is_a_usage_error() {
    let output = run(&["--bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown option: --bogus"));
}

#[test]
fn truncated_payload_is_logged_only_at_debug() {
    // 4-byte write to CTRL with only two payload bytes left
    let input = [0x00, 0x00, 0x00, 0x04, 0x01, 0x02];

    let quiet = run_saved_input(&input, &[]);
    assert_eq!(quiet.status.code(), Some(0));
    assert!(stdout(&quiet).contains("[FUZZ] num_messages: 0."));
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("short payload"));

    let debug = run_saved_input(&input, &["--log-level", "virtfuzz_core=debug"]);
    assert_eq!(debug.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&debug.stderr);
    assert!(stderr.contains("DEBUG"));
    assert!(stderr.contains("discarding message with short payload"));
}
