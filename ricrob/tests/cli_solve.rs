//! CLI tests for `ricrob solve`.
//!
//! Spawns the binary and checks exit codes and the JSON-lines output.
#![cfg(unix)]

use std::process::Command;

use ricrob::exit_codes;
use ricrob::test_support::FakeSolvers;
use serde_json::Value;

const TASK_ARGS: [&str; 18] = [
    "--tl", "A1", "--tr", "B2", "--bl", "C3", "--br", "D4", "--yellow", "0,0", "--red", "15,0",
    "--green", "0,15", "--blue", "15,15", "--target", "red-moon",
];

fn ricrob(solvers: &str, task_args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ricrob"))
        .env_remove("RICROB_CONFIG")
        .arg("solve")
        .arg("--solvers")
        .arg(solvers)
        .args(task_args)
        .output()
        .expect("run ricrob")
}

#[test]
fn solve_prints_one_line_per_solver() {
    let fakes = FakeSolvers::new().expect("fakes");
    let ok = fakes.sentinel("ok", 0.0, r#"["y-up"]"#).expect("ok");
    let bad = fakes.failing("bad", 0.0, 1).expect("bad");

    let output = ricrob(&format!("{ok},{bad}"), &TASK_ARGS);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line["task"]["target"], "red-moon");
        assert!(line.get("error").is_some());
        assert!(line.get("moves").is_some());
    }
    assert!(lines.iter().any(|l| l["moves"][0] == "y-up"));
    assert!(lines.iter().any(|l| l["error"]["kind"] == "exit"));
}

#[test]
fn all_failures_exit_with_no_solution() {
    let fakes = FakeSolvers::new().expect("fakes");
    let mute = fakes.without_result("mute").expect("mute");

    let output = ricrob(mute.as_str(), &TASK_ARGS);
    assert_eq!(output.status.code(), Some(exit_codes::NO_SOLUTION));
}

#[test]
fn off_board_robot_is_invalid() {
    let fakes = FakeSolvers::new().expect("fakes");
    let ok = fakes.sentinel("ok", 0.0, "[]").expect("ok");
    let mut args = TASK_ARGS.to_vec();
    args[9] = "16,0";

    let output = ricrob(ok.as_str(), &args);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("yellow"), "stderr: {stderr}");
}
