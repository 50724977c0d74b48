//! Shared test helpers: output constructors and config builders.

#![allow(dead_code)]

use std::process::{ExitStatus, Output};

use infraguard_cli::domain::{RetryTable, ScenarioConfig};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
/// On Windows `ExitStatusExt::from_raw` takes the exit code directly.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

pub fn plan_output(code: i32, stdout: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub const APPLY_OK: &[u8] = b"Apply complete! Resources: 3 added, 0 changed, 0 destroyed.\n";
pub const STATE_LOCK: &[u8] = b"Error: Error acquiring the state lock\n\nLock Info: ...";

// ── Config builders ──────────────────────────────────────────────────────────

/// Config with no retries and no timeout.
pub fn config() -> ScenarioConfig {
    ScenarioConfig::new("/tmp/infraguard-test")
}

/// Config retrying the default table `max_retries` times with no pause.
pub fn retrying_config(max_retries: u32) -> ScenarioConfig {
    let mut cfg = config();
    cfg.retryable_errors = RetryTable::defaults();
    cfg.retry.max_retries = max_retries;
    cfg
}

/// Config carrying a sensitive password variable.
pub fn config_with_password(password: &str) -> ScenarioConfig {
    let mut cfg = config();
    cfg.variables.insert("db_pwd".into(), password.into());
    cfg.sensitive_variables.insert("db_pwd".into());
    cfg
}
