//! Integration tests for the infraguard binary
//!
//! These tests verify argument parsing, the catalog, and a full scenario run
//! against a stand-in provisioning tool script.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn infraguard() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("infraguard"));
    cmd.env("NO_COLOR", "1");
    for var in [
        "INFRAGUARD_CONFIG",
        "INFRAGUARD_TOOL",
        "INFRAGUARD_WORKING_DIR",
        "INFRAGUARD_MAX_RETRIES",
        "INFRAGUARD_SCENARIO_TIMEOUT_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2, but
    // only when no global arg arrives from the environment either
    infraguard()
        .env_remove("NO_COLOR")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("always tear it down"));
}

#[test]
fn test_cli_help_lists_commands() {
    infraguard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    infraguard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("infraguard"));
}

#[test]
fn test_version_command_shows_version() {
    infraguard()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("infraguard 0.1.0"));
}

#[test]
fn test_no_color_accepts_common_env_values() {
    for value in ["1", "true", "yes", "", "0", "false"] {
        infraguard()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("infraguard 0.1.0"));
    }
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = infraguard()
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(doc["version"], "0.1.0");
}

#[test]
fn test_version_ignores_broken_settings_file() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("infraguard.yaml"), "max_retries: [not a number\n")
        .expect("write");
    infraguard()
        .current_dir(dir.path())
        .arg("version")
        .assert()
        .success();
}

// --- Catalog ---

#[test]
fn test_list_shows_builtin_scenarios() {
    let dir = TempDir::new().expect("tempdir");
    infraguard()
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("rds-endpoint"))
        .stdout(predicate::str::contains("idempotent-apply"))
        .stdout(predicate::str::contains("idempotent-apply-env"))
        .stdout(predicate::str::contains("rds-private-address"));
}

#[test]
fn test_list_json_never_prints_passwords() {
    let dir = TempDir::new().expect("tempdir");
    let output = infraguard()
        .current_dir(dir.path())
        .args(["list", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("test1234"), "literal password leaked: {stdout}");

    let doc: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let scenarios = doc["scenarios"].as_array().expect("scenarios array");
    assert_eq!(scenarios.len(), 4);
    assert_eq!(scenarios[0]["name"], "rds-endpoint");
    assert_eq!(scenarios[0]["password"], "literal");
    assert_eq!(scenarios[2]["password"], "env DB_PWD");
}

#[test]
fn test_list_includes_scenario_file() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("extra.yaml");
    std::fs::write(&file, "scenarios:\n  - name: custom-check\n    description: Extra\n")
        .expect("write");
    infraguard()
        .current_dir(dir.path())
        .arg("list")
        .arg("--scenarios-file")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-check"));
}

#[test]
fn test_list_rejects_duplicate_scenario_names() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("dup.yaml");
    std::fs::write(&file, "scenarios:\n  - name: rds-endpoint\n").expect("write");
    infraguard()
        .current_dir(dir.path())
        .arg("list")
        .arg("--scenarios-file")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate scenario name: rds-endpoint"));
}

// --- Run: failures before provisioning ---

#[test]
fn test_run_unknown_scenario_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    infraguard()
        .current_dir(dir.path())
        .args(["run", "no-such-scenario"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown scenario: no-such-scenario"));
}

#[test]
fn test_run_rejects_malformed_var() {
    infraguard()
        .args(["run", "rds-endpoint", "--var", "novalue"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[cfg(unix)]
#[test]
fn test_run_missing_password_env_never_provisions() {
    let dir = TempDir::new().expect("tempdir");
    let tool = fake_tool(dir.path(), 0);
    infraguard()
        .current_dir(dir.path())
        .env_remove("DB_PWD")
        .arg("run")
        .arg("idempotent-apply-env")
        .arg("--tool")
        .arg(&tool)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DB_PWD"));
    assert!(calls(dir.path()).is_empty(), "tool must not run");
}

// --- Run: full lifecycle against a stand-in tool ---

/// Write an executable script that answers like the provisioning tool and
/// appends each verb to `calls.log` in its working directory.
#[cfg(unix)]
fn fake_tool(dir: &Path, destroy_exit: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
verb="$1"
for last; do :; done
echo "$verb" >> calls.log
case "$verb" in
  init) echo "Terraform has been successfully initialized!" ;;
  apply) echo "Apply complete! Resources: 2 added, 0 changed, 0 destroyed." ;;
  plan) echo "No changes. Your infrastructure matches the configuration." ;;
  output)
    if [ "$last" = "endpoint" ]; then
      echo '"mydb.c9akciq32.eu-west-3.rds.amazonaws.com:5432"'
    else
      echo "Error: Output \"$last\" not found" >&2
      exit 1
    fi ;;
  destroy)
    if [ {destroy_exit} -ne 0 ]; then
      echo "Error: DependencyViolation" >&2
      exit {destroy_exit}
    fi
    echo "Destroy complete! Resources: 2 destroyed." ;;
esac
exit 0
"#
    );
    let path = dir.join("fake-terraform");
    std::fs::write(&path, script).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}

#[cfg(unix)]
fn calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

#[cfg(unix)]
#[test]
fn test_run_endpoint_scenario_passes_and_destroys() {
    let dir = TempDir::new().expect("tempdir");
    let tool = fake_tool(dir.path(), 0);

    let output = infraguard()
        .current_dir(dir.path())
        .args(["--json", "run", "rds-endpoint", "-C", "."])
        .arg("--tool")
        .arg(&tool)
        .output()
        .expect("run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    let doc: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(doc["passed"], true);
    assert_eq!(doc["summary"]["passed"], 1);
    let report = &doc["scenarios"][0];
    assert_eq!(report["name"], "rds-endpoint");
    assert_eq!(report["state"], "torn_down");
    assert_eq!(report["reached"], "verified");
    assert_eq!(report["changes"]["add"], 2);
    assert_eq!(
        report["outputs"]["endpoint"],
        "mydb.c9akciq32.eu-west-3.rds.amazonaws.com:5432"
    );
    assert!(!stdout.contains("test1234"), "password leaked: {stdout}");

    assert_eq!(calls(dir.path()), vec!["init", "apply", "output", "destroy"]);
}

#[cfg(unix)]
#[test]
fn test_run_idempotent_scenario_human_output() {
    let dir = TempDir::new().expect("tempdir");
    let tool = fake_tool(dir.path(), 0);

    infraguard()
        .current_dir(dir.path())
        .arg("run")
        .arg("idempotent-apply")
        .arg("--tool")
        .arg(&tool)
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"))
        .stdout(predicate::str::contains("idempotent-apply"));

    assert_eq!(calls(dir.path()), vec!["init", "apply", "plan", "destroy"]);
}

#[cfg(unix)]
#[test]
fn test_run_destroy_failure_fails_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let tool = fake_tool(dir.path(), 1);

    let output = infraguard()
        .current_dir(dir.path())
        .args(["--json", "run", "rds-endpoint"])
        .arg("--tool")
        .arg(&tool)
        .env("INFRAGUARD_MAX_RETRIES", "0")
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(doc["passed"], false);
    let failures = doc["scenarios"][0]["failures"]
        .as_array()
        .expect("failures array");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["stage"], "destroy");
    assert_eq!(failures[0]["kind"], "destroy_error");
    assert_eq!(
        calls(dir.path()).iter().filter(|c| *c == "destroy").count(),
        1
    );
}

#[cfg(unix)]
#[test]
fn test_run_missing_tool_binary_still_reports() {
    let dir = TempDir::new().expect("tempdir");

    let output = infraguard()
        .current_dir(dir.path())
        .args(["--json", "run", "rds-endpoint", "--tool", "/nonexistent/terraform"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let failures = doc["scenarios"][0]["failures"]
        .as_array()
        .expect("failures array");
    let stages: Vec<&str> = failures
        .iter()
        .filter_map(|f| f["stage"].as_str())
        .collect();
    assert_eq!(stages, vec!["init", "destroy"]);
}
