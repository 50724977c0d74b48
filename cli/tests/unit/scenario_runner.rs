//! Unit tests for `run_scenario` and `run_all`.
//!
//! Every scenario here runs against `MockTool` and `MockResolver`; the
//! assertions cover the report contents and the exact verb sequence.

#![allow(clippy::expect_used)]

use std::collections::BTreeMap;
use std::time::Duration;

use infraguard_cli::application::services::scenario_runner::{
    group_by_working_dir, run_all, run_scenario,
};
use infraguard_cli::domain::scenario::OutputExpectation;
use infraguard_cli::domain::{
    ApplyMode, HarnessError, Scenario, ScenarioConfig, ScenarioState, Stage,
};
use infraguard_common::{ChangeSummary, Verdict};

use crate::helpers::{config, err_output, plan_output};
use crate::mocks::{MockResolver, MockTool, RecordingReporter};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn scenario(name: &str) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: String::new(),
        working_dir: None,
        password: None,
        variables: BTreeMap::new(),
        mode: ApplyMode::Apply,
        expect_outputs: Vec::new(),
        private_endpoints: Vec::new(),
    }
}

fn endpoint_scenario() -> Scenario {
    let mut s = scenario("rds-endpoint");
    s.expect_outputs.push(OutputExpectation {
        name: "endpoint".to_string(),
        contains: ".eu-west-3.rds.amazonaws.com".to_string(),
    });
    s
}

fn private_scenario() -> Scenario {
    let mut s = scenario("rds-private-address");
    s.private_endpoints.push("rds_instance_address".to_string());
    s
}

// ── Output checks ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_endpoint_in_expected_region_passes() {
    let tool = MockTool::new().with_output(
        "endpoint",
        r#""mydb.c9akciq32.eu-west-3.rds.amazonaws.com:5432""#,
    );
    let reporter = RecordingReporter::default();

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &reporter,
        &endpoint_scenario(),
        &config(),
    )
    .await;

    assert!(report.passed(), "failures: {:?}", report.failures);
    assert!(report.passed);
    assert_eq!(report.reached, ScenarioState::Verified);
    assert_eq!(report.state, ScenarioState::TornDown);
    assert_eq!(report.changes, Some(ChangeSummary::new(3, 0, 0)));
    assert_eq!(
        report.outputs.get("endpoint").map(String::as_str),
        Some("mydb.c9akciq32.eu-west-3.rds.amazonaws.com:5432")
    );
    assert_eq!(
        tool.calls(),
        vec!["init", "apply", "output endpoint", "destroy"]
    );
    assert!(
        reporter
            .messages()
            .iter()
            .all(|m| m.contains("rds-endpoint: ")),
        "messages: {:?}",
        reporter.messages()
    );
}

#[tokio::test]
async fn test_endpoint_in_wrong_region_is_output_mismatch() {
    let tool = MockTool::new().with_output(
        "endpoint",
        r#""mydb.c9akciq32.us-east-1.rds.amazonaws.com:5432""#,
    );

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &endpoint_scenario(),
        &config(),
    )
    .await;

    assert!(!report.passed());
    let failure = report.primary_failure().expect("one failure");
    assert_eq!(failure.stage, Stage::Verify);
    assert!(matches!(
        &failure.error,
        HarnessError::OutputMismatch { name, .. } if name == "endpoint"
    ));
    assert_eq!(report.reached, ScenarioState::Errored);
    assert_eq!(report.state, ScenarioState::TornDown);
    assert_eq!(tool.count("destroy"), 1);
}

#[tokio::test]
async fn test_missing_output_is_reported_at_verify() {
    let tool = MockTool::new();

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &endpoint_scenario(),
        &config(),
    )
    .await;

    let failure = report.primary_failure().expect("one failure");
    assert_eq!(failure.stage, Stage::Verify);
    assert_eq!(failure.error.kind(), "output_not_found");
}

// ── Private endpoints ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_private_address_passes() {
    let tool = MockTool::new().with_output("rds_instance_address", r#""db.internal.example""#);
    let resolver = MockResolver::new().with("db.internal.example", &["10.0.1.23"]);

    let report = run_scenario(
        &tool,
        &resolver,
        &RecordingReporter::default(),
        &private_scenario(),
        &config(),
    )
    .await;

    assert!(report.passed(), "failures: {:?}", report.failures);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].verdict, Verdict::Pass);
}

#[tokio::test]
async fn test_public_address_is_security_violation() {
    let tool = MockTool::new().with_output("rds_instance_address", r#""db.public.example""#);
    let resolver = MockResolver::new().with("db.public.example", &["10.0.1.23", "52.1.2.3"]);

    let report = run_scenario(
        &tool,
        &resolver,
        &RecordingReporter::default(),
        &private_scenario(),
        &config(),
    )
    .await;

    let failure = report.primary_failure().expect("one failure");
    assert_eq!(failure.stage, Stage::Verify);
    match &failure.error {
        HarnessError::SecurityViolation { host, address } => {
            assert_eq!(host, "db.public.example");
            assert_eq!(address.to_string(), "52.1.2.3");
        }
        other => panic!("expected SecurityViolation, got {other:?}"),
    }
    assert_eq!(report.findings.len(), 1, "finding is kept for the report");
    assert_eq!(report.findings[0].verdict, Verdict::Fail);
    assert_eq!(tool.count("destroy"), 1);
}

#[tokio::test]
async fn test_unresolvable_endpoint_is_resolution_error() {
    let tool = MockTool::new().with_output("rds_instance_address", r#""nowhere.invalid""#);

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &private_scenario(),
        &config(),
    )
    .await;

    let failure = report.primary_failure().expect("one failure");
    assert!(
        matches!(&failure.error, HarnessError::Resolution { host, .. } if host == "nowhere.invalid"),
        "got {failure:?}"
    );
    assert!(report.findings.is_empty());
}

// ── Idempotency ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_idempotency_failure_reports_pending_changes() {
    let tool = MockTool::new().script(
        "plan",
        vec![plan_output(2, b"Plan: 0 to add, 1 to change, 0 to destroy.\n")],
    );
    let mut s = scenario("idempotent-apply");
    s.mode = ApplyMode::ApplyIdempotent;

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &s,
        &config(),
    )
    .await;

    let failure = report.primary_failure().expect("one failure");
    assert_eq!(failure.stage, Stage::Apply);
    assert_eq!(
        failure.error,
        HarnessError::Idempotency {
            pending: ChangeSummary::new(0, 1, 0)
        }
    );
    assert_eq!(tool.calls(), vec!["init", "apply", "plan", "destroy"]);
}

// ── Teardown guarantees ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_init_failure_still_destroys_once() {
    let tool = MockTool::new().script("init", vec![err_output(1, b"Error: backend unreachable")]);

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &endpoint_scenario(),
        &config(),
    )
    .await;

    assert_eq!(report.primary_failure().map(|f| f.stage), Some(Stage::Init));
    assert_eq!(tool.calls(), vec!["init", "destroy"]);
    assert_eq!(report.changes, None);
    assert_eq!(report.state, ScenarioState::TornDown);
}

#[tokio::test]
async fn test_apply_and_destroy_failures_are_both_reported_in_order() {
    let tool = MockTool::new()
        .script("apply", vec![err_output(1, b"Error: quota exceeded")])
        .script("destroy", vec![err_output(1, b"Error: DependencyViolation")]);

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &scenario("plain"),
        &config(),
    )
    .await;

    let stages: Vec<Stage> = report.failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, vec![Stage::Apply, Stage::Destroy]);
    assert_eq!(report.failures[0].error.kind(), "apply_error");
    assert_eq!(report.failures[1].error.kind(), "destroy_error");
    assert!(!report.passed);
}

#[tokio::test]
async fn test_destroy_failure_alone_fails_a_verified_scenario() {
    let tool = MockTool::new().script("destroy", vec![err_output(1, b"Error: timeout")]);
    let reporter = RecordingReporter::default();

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &reporter,
        &scenario("plain"),
        &config(),
    )
    .await;

    assert_eq!(report.reached, ScenarioState::Verified);
    assert_eq!(report.primary_failure().map(|f| f.stage), Some(Stage::Destroy));
    assert!(
        reporter
            .messages()
            .contains(&"warn plain: destroy failed".to_string())
    );
}

#[tokio::test]
async fn test_zero_timeout_stops_before_init_but_still_destroys() {
    let tool = MockTool::new();
    let mut cfg = config();
    cfg.timeout = Some(Duration::ZERO);

    let report = run_scenario(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &scenario("slow"),
        &cfg,
    )
    .await;

    let failure = report.primary_failure().expect("timeout failure");
    assert_eq!(failure.stage, Stage::Init);
    assert_eq!(
        failure.error,
        HarnessError::Timeout {
            limit: Duration::ZERO
        }
    );
    assert_eq!(tool.calls(), vec!["destroy"]);
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

fn job(s: &Scenario, dir: &str) -> (Scenario, ScenarioConfig) {
    (s.clone(), ScenarioConfig::new(dir))
}

#[test]
fn test_group_by_working_dir_keeps_first_seen_order() {
    let a = scenario("a");
    let owned = [
        job(&a, "/work/x"),
        job(&a, "/work/y"),
        job(&a, "/work/x"),
        job(&a, "/work/z"),
    ];
    let jobs: Vec<(&Scenario, ScenarioConfig)> =
        owned.iter().map(|(s, c)| (s, c.clone())).collect();

    assert_eq!(
        group_by_working_dir(&jobs),
        vec![vec![0, 2], vec![1], vec![3]]
    );
}

#[tokio::test]
async fn test_run_all_parallel_returns_reports_in_job_order() {
    let tool = MockTool::new();
    let first = scenario("first");
    let second = scenario("second");
    let third = scenario("third");
    let jobs = vec![
        (&first, ScenarioConfig::new("/work/a")),
        (&second, ScenarioConfig::new("/work/b")),
        (&third, ScenarioConfig::new("/work/a")),
    ];

    let reports = run_all(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &jobs,
        true,
    )
    .await;

    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert!(reports.iter().all(|r| r.passed()));
    assert_eq!(tool.count("destroy"), 3);
}

#[tokio::test]
async fn test_run_all_sequential_isolates_failures() {
    let tool = MockTool::new().script("apply", vec![err_output(1, b"Error: boom")]);
    let failing = scenario("failing");
    let passing = scenario("passing");
    let jobs = vec![
        (&failing, ScenarioConfig::new("/work/a")),
        (&passing, ScenarioConfig::new("/work/a")),
    ];

    let reports = run_all(
        &tool,
        &MockResolver::new(),
        &RecordingReporter::default(),
        &jobs,
        false,
    )
    .await;

    assert!(!reports[0].passed());
    assert!(reports[1].passed());
    assert_eq!(tool.count("destroy"), 2);
}
