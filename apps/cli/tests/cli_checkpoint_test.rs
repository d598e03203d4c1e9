//! Integration tests for the `forge inspect` and `forge verify` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Write a checkpoint by hand: the state files plus one burn model.
fn write_checkpoint(dir: &Path) {
    std::fs::write(
        dir.join("system.json"),
        r#"{
  "mode": "train",
  "global_step": 3,
  "epoch_idx": 1,
  "batch_idx": 3,
  "stop_requested": false,
  "device_count": 1,
  "log_interval": null,
  "total_epochs": 5,
  "max_train_steps_per_epoch": null,
  "max_eval_steps_per_epoch": null,
  "experiment_started_at": "20261018-120000"
}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("summary.json"),
        r#"{"name":"exp1","system_config":null,"history":{"train":{"accuracy":{"1":0.5,"3":0.9}}}}"#,
    )
    .unwrap();
    std::fs::write(dir.join("traces.json"), "[]").unwrap();
    std::fs::write(dir.join("tops.json"), "[]").unwrap();
    std::fs::write(dir.join("nops.json"), "[]").unwrap();
    std::fs::write(dir.join("ds.json"), "{}").unwrap();
    std::fs::write(dir.join("encoder.mpk"), [1u8, 2, 3]).unwrap();
    std::fs::write(dir.join("encoder_opt.mpk"), [4u8, 5]).unwrap();
}

#[test]
fn test_inspect_prints_state_and_summary() {
    let temp_dir = TempDir::new().unwrap();
    write_checkpoint(temp_dir.path());

    let mut cmd = Command::cargo_bin("forge-cli").unwrap();
    cmd.arg("inspect")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Global step"))
        .stdout(predicate::str::contains("Summary: exp1"))
        .stdout(predicate::str::contains("accuracy"));
}

#[test]
fn test_inspect_json() {
    let temp_dir = TempDir::new().unwrap();
    write_checkpoint(temp_dir.path());

    let mut cmd = Command::cargo_bin("forge-cli").unwrap();
    let output = cmd.arg("inspect").arg(temp_dir.path()).arg("--json").assert().success().get_output().clone();

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["system"]["global_step"], 3);
    assert_eq!(value["system"]["mode"], "train");
    assert_eq!(value["summary"]["name"], "exp1");
    assert_eq!(value["summary"]["metrics"][0]["latest_step"], 3);
    assert_eq!(value["summary"]["metrics"][0]["points"], 2);
}

#[test]
fn test_inspect_without_system_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("forge-cli").unwrap();
    cmd.arg("inspect")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read system state"));
}

#[test]
fn test_verify_complete_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    write_checkpoint(temp_dir.path());

    let mut cmd = Command::cargo_bin("forge-cli").unwrap();
    cmd.arg("verify")
        .arg(temp_dir.path())
        .arg("--model")
        .arg("encoder:burn")
        .assert()
        .success()
        .stdout(predicate::str::contains("Checkpoint is complete"));
}

#[test]
fn test_verify_reports_missing_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    write_checkpoint(temp_dir.path());
    std::fs::remove_file(temp_dir.path().join("ds.json")).unwrap();

    let mut cmd = Command::cargo_bin("forge-cli").unwrap();
    cmd.arg("verify")
        .arg(temp_dir.path())
        .arg("--model")
        .arg("encoder:burn")
        .arg("--model")
        .arg("head:candle")
        .assert()
        .failure()
        .stdout(predicate::str::contains("ds.json"))
        .stdout(predicate::str::contains("head_opt.safetensors"))
        .stderr(predicate::str::contains("3 problem(s)"));
}

#[test]
fn test_verify_rejects_bad_model_spec() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("forge-cli").unwrap();
    cmd.arg("verify")
        .arg(temp_dir.path())
        .arg("--model")
        .arg("encoder:onnx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}
