//! Parsers for provisioning tool output.
//!
//! Pure functions: captured stdout text in, data out.

use std::sync::LazyLock;

use infraguard_common::ChangeSummary;
use regex::Regex;

#[allow(clippy::expect_used)] // Patterns are compile-time constants
static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"));

#[allow(clippy::expect_used)]
static PLAN_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Plan: (\d+) to add, (\d+) to change, (\d+) to destroy").expect("valid regex")
});

#[allow(clippy::expect_used)]
static APPLY_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Apply complete! Resources: (\d+) added, (\d+) changed, (\d+) destroyed")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static DESTROY_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Destroy complete! Resources: (\d+) destroyed").expect("valid regex")
});

/// Remove ANSI color sequences so summaries parse with colors enabled.
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Parse the change summary of a plan.
///
/// Recognises `Plan: X to add, Y to change, Z to destroy.` and the
/// `No changes.` banner. Returns `None` when neither is present.
#[must_use]
pub fn parse_plan_summary(stdout: &str) -> Option<ChangeSummary> {
    let clean = strip_ansi(stdout);
    if let Some(summary) = capture_three(&PLAN_SUMMARY, &clean) {
        return Some(summary);
    }
    clean.contains("No changes.").then(ChangeSummary::default)
}

/// Parse `Apply complete! Resources: X added, Y changed, Z destroyed.`
#[must_use]
pub fn parse_apply_summary(stdout: &str) -> Option<ChangeSummary> {
    capture_three(&APPLY_SUMMARY, &strip_ansi(stdout))
}

/// Parse `Destroy complete! Resources: N destroyed.` into the destroyed count.
#[must_use]
pub fn parse_destroy_count(stdout: &str) -> Option<u32> {
    DESTROY_SUMMARY
        .captures(&strip_ansi(stdout))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn capture_three(re: &Regex, text: &str) -> Option<ChangeSummary> {
    // The last summary wins: a refresh-only preamble may precede the real one.
    let caps = re.captures_iter(text).last()?;
    let n = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    Some(ChangeSummary::new(n(1)?, n(2)?, n(3)?))
}

/// Render the JSON emitted by `output -json NAME` as a plain string.
///
/// String values are unquoted; any other JSON value (list, map, number) is
/// rendered compactly. Non-JSON text is returned trimmed as-is.
#[must_use]
pub fn parse_output_value(stdout: &str) -> String {
    let trimmed = stdout.trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Combine captured stdout and stderr into one lossily-decoded string.
#[must_use]
pub fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.trim().to_string(),
        (true, false) => stderr.trim().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim(), stderr.trim()),
    }
}
