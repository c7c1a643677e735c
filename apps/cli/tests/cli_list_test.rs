//! Integration tests for the `stratum list` and `stratum presets` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from any user config files.
fn stratum(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stratum-cli").unwrap();
    cmd.current_dir(temp_dir.path()).env("HOME", temp_dir.path());
    cmd
}

#[test]
fn test_list_shows_factories() {
    let temp_dir = TempDir::new().unwrap();
    stratum(&temp_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt3_175b_performance"))
        .stdout(predicate::str::contains("nemotron4_22b_optimized"))
        .stdout(predicate::str::contains("nemotron4_22b.pretrain_recipe"));
}

#[test]
fn test_list_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = stratum(&temp_dir).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 4);

    let optimized = entries
        .iter()
        .find(|e| e["name"] == "nemotron4_22b_optimized")
        .unwrap();
    assert_eq!(optimized["defaults"]["num_nodes"], 8);
    assert_eq!(
        optimized["aliases"][0],
        "nemotron4_22b.pretrain_recipe_performance"
    );
}

#[test]
fn test_presets_lists_architectures_and_profiles() {
    let temp_dir = TempDir::new().unwrap();
    stratum(&temp_dir)
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("nemotron4_340b"))
        .stdout(predicate::str::contains("userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048"));
}

#[test]
fn test_presets_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = stratum(&temp_dir)
        .args(["presets", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let architectures = listing["architectures"].as_array().unwrap();
    let gpt = architectures
        .iter()
        .find(|p| p["name"] == "gpt3_175b")
        .unwrap();
    assert_eq!(gpt["num_layers"], 96);
    assert_eq!(gpt["hidden_size"], 12288);
    assert_eq!(listing["tp_overlap_profiles"].as_array().unwrap().len(), 2);
}

#[test]
fn test_no_command_prints_help() {
    let temp_dir = TempDir::new().unwrap();
    stratum(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}
