use std::{fs, process::Command};

use serde_yaml::Value;

fn run(limits: &[&str], program: &[&str]) -> Value {
    let dir = tempfile::TempDir::new().unwrap();
    let report = dir.path().join("report.yaml");
    let status = Command::new(env!("CARGO_BIN_EXE_forge_cell"))
        .args(limits)
        .arg("-o")
        .arg(&report)
        .arg(program[0])
        .arg("--")
        .args(&program[1..])
        .status()
        .unwrap();
    assert!(status.success());
    serde_yaml::from_str(&fs::read_to_string(&report).unwrap()).unwrap()
}

#[test]
fn reports_exit_code() {
    let report = run(&["-t", "1000", "-m", "256"], &["sh", "-c", "exit 3"]);
    assert_eq!(report["exitcode"].as_i64(), Some(3));
    assert!(report["signal"].is_null());
    assert_eq!(report["killed"].as_bool(), Some(false));
    assert!(report["time"].as_u64().is_some());
    assert!(report["memory"].as_u64().unwrap() > 0);
}

#[test]
fn successful_run() {
    let report = run(&["-t", "1000"], &["true"]);
    assert_eq!(report["exitcode"].as_i64(), Some(0));
}

#[test]
fn real_time_limit_kills() {
    let report = run(&["-t", "100", "-r", "300"], &["sleep", "5"]);
    assert_eq!(report["killed"].as_bool(), Some(true));
    assert_eq!(report["signal"].as_i64(), Some(9));
    assert!(report["exitcode"].is_null());
}

#[test]
fn missing_program_exits_124() {
    let report = run(&[], &["/definitely/not/a/program"]);
    assert_eq!(report["exitcode"].as_i64(), Some(124));
}
