//! Scenario runner: init, apply, verify, and guaranteed teardown for one
//! scenario, plus fan-out over many.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use infraguard_common::{ChangeSummary, Finding};

use crate::application::ports::{HostResolver, ProgressReporter, ProvisioningTool};
use crate::application::services::lifecycle::{BodyError, with_teardown};
use crate::application::services::network_check;
use crate::application::services::provisioning::ProvisioningDriver;
use crate::domain::{
    ApplyMode, HarnessError, Scenario, ScenarioConfig, ScenarioReport, ScenarioState, Stage,
    StageFailure,
};

/// What the body has observed so far; read back after teardown.
struct Progress {
    state: ScenarioState,
    stage: Stage,
    changes: Option<ChangeSummary>,
    outputs: BTreeMap<String, String>,
    findings: Vec<Finding>,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: ScenarioState::NotStarted,
            stage: Stage::Init,
            changes: None,
            outputs: BTreeMap::new(),
            findings: Vec::new(),
        }
    }
}

/// Scenario-level deadline, checked before every stage.
#[derive(Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    fn check(deadline: Option<Self>, stage: Stage) -> Result<(), StageFailure> {
        match deadline {
            Some(d) if Instant::now() >= d.at => Err(StageFailure::new(
                stage,
                HarnessError::Timeout { limit: d.limit },
            )),
            _ => Ok(()),
        }
    }
}

/// Run one scenario to completion and report what happened.
///
/// Never returns early: every failure ends up in the report, and destroy is
/// invoked exactly once whatever the body did.
pub async fn run_scenario<T, R, P>(
    tool: &T,
    resolver: &R,
    reporter: &P,
    scenario: &Scenario,
    config: &ScenarioConfig,
) -> ScenarioReport
where
    T: ProvisioningTool,
    R: HostResolver,
    P: ProgressReporter,
{
    let started = Instant::now();
    let mut report = ScenarioReport::new(&scenario.name, Utc::now());
    let deadline = config.timeout.map(|limit| Deadline {
        at: started + limit,
        limit,
    });
    tracing::info!(scenario = %scenario.name, dir = %config.working_dir.display(), "scenario start");

    let driver = match deadline {
        Some(d) => ProvisioningDriver::new(tool, config).with_retry_deadline(d.at),
        None => ProvisioningDriver::new(tool, config),
    };
    let progress = RefCell::new(Progress::new());

    let guarded = with_teardown(&driver, |d| {
        scenario_body(d, resolver, reporter, scenario, &progress, deadline)
    })
    .await;

    let progress = progress.into_inner();
    report.changes = progress.changes;
    report.outputs = progress.outputs;
    report.findings = progress.findings;

    match guarded.body {
        Ok(()) => {}
        Err(BodyError::Failed(failure)) => report.fail(failure),
        Err(BodyError::Panicked(message)) => report.fail(StageFailure::new(
            progress.stage,
            HarnessError::Aborted {
                reason: format!("panicked: {message}"),
            },
        )),
    }
    let reached = if report.passed() {
        progress.state
    } else {
        progress.state.errored()
    };
    report.reached = reached;

    match guarded.teardown {
        Ok(()) => reporter.success(&format!("{}: destroyed", scenario.name)),
        Err(e) => {
            reporter.warn(&format!("{}: destroy failed", scenario.name));
            report.fail(StageFailure::new(Stage::Destroy, e));
        }
    }
    report.state = reached.torn_down();
    report.elapsed = started.elapsed();

    if report.passed() {
        tracing::info!(scenario = %scenario.name, "scenario passed");
    } else {
        tracing::info!(scenario = %scenario.name, failures = report.failures.len(), "scenario failed");
    }
    report
}

async fn scenario_body<T, R, P>(
    driver: &ProvisioningDriver<'_, T>,
    resolver: &R,
    reporter: &P,
    scenario: &Scenario,
    progress: &RefCell<Progress>,
    deadline: Option<Deadline>,
) -> Result<(), StageFailure>
where
    T: ProvisioningTool,
    R: HostResolver,
    P: ProgressReporter,
{
    let name = &scenario.name;
    let enter = |stage: Stage| -> Result<(), StageFailure> {
        progress.borrow_mut().stage = stage;
        Deadline::check(deadline, stage)
    };
    let advance = |next: fn(ScenarioState) -> ScenarioState| {
        let mut p = progress.borrow_mut();
        p.state = next(p.state);
    };

    // ── init ──
    enter(Stage::Init)?;
    reporter.step(&format!("{name}: init"));
    driver
        .init()
        .await
        .map_err(|e| StageFailure::new(Stage::Init, e))?;
    advance(ScenarioState::initialized);

    // ── apply ──
    enter(Stage::Apply)?;
    let changes = match scenario.mode {
        ApplyMode::Apply => {
            reporter.step(&format!("{name}: apply"));
            driver.apply().await
        }
        ApplyMode::ApplyIdempotent => {
            reporter.step(&format!("{name}: apply (idempotency check)"));
            driver.apply_and_verify_idempotent().await
        }
    }
    .map_err(|e| StageFailure::new(Stage::Apply, e))?;
    progress.borrow_mut().changes = Some(changes);
    advance(ScenarioState::applied);
    reporter.success(&format!("{name}: applied ({changes})"));

    // ── verify ──
    enter(Stage::Verify)?;
    let verify = |e: HarnessError| StageFailure::new(Stage::Verify, e);

    for expectation in &scenario.expect_outputs {
        let value = read_output(driver, progress, &expectation.name)
            .await
            .map_err(verify)?;
        if !value.contains(&expectation.contains) {
            return Err(verify(HarnessError::OutputMismatch {
                name: expectation.name.clone(),
                expected: expectation.contains.clone(),
                actual: value,
            }));
        }
        reporter.success(&format!("{name}: output {} ok", expectation.name));
    }

    for endpoint in &scenario.private_endpoints {
        Deadline::check(deadline, Stage::Verify)?;
        let host = read_output(driver, progress, endpoint)
            .await
            .map_err(verify)?;
        reporter.step(&format!("{name}: resolving {host}"));
        let finding = network_check::check_host(resolver, &host)
            .await
            .map_err(verify)?;
        progress.borrow_mut().findings.push(finding.clone());
        network_check::enforce_private(&finding).map_err(verify)?;
        reporter.success(&format!("{name}: {host} is private"));
    }

    advance(ScenarioState::verified);
    Ok(())
}

async fn read_output<T: ProvisioningTool>(
    driver: &ProvisioningDriver<'_, T>,
    progress: &RefCell<Progress>,
    name: &str,
) -> Result<String, HarnessError> {
    let value = driver.output(name).await?;
    progress
        .borrow_mut()
        .outputs
        .insert(name.to_string(), value.clone());
    Ok(value)
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

/// Run every `(scenario, config)` job and return reports in job order.
///
/// With `parallel`, jobs are grouped by working directory: groups run
/// concurrently on the current task, jobs inside a group run one after
/// another. Without it, everything runs sequentially.
pub async fn run_all<T, R, P>(
    tool: &T,
    resolver: &R,
    reporter: &P,
    jobs: &[(&Scenario, ScenarioConfig)],
    parallel: bool,
) -> Vec<ScenarioReport>
where
    T: ProvisioningTool,
    R: HostResolver,
    P: ProgressReporter,
{
    if !parallel {
        let mut reports = Vec::with_capacity(jobs.len());
        for (scenario, config) in jobs {
            reports.push(run_scenario(tool, resolver, reporter, scenario, config).await);
        }
        return reports;
    }

    let groups = group_by_working_dir(jobs);
    let runs = groups.into_iter().map(|indices| async move {
        let mut out = Vec::with_capacity(indices.len());
        for i in indices {
            let (scenario, config) = &jobs[i];
            out.push((i, run_scenario(tool, resolver, reporter, scenario, config).await));
        }
        out
    });
    let mut indexed: Vec<(usize, ScenarioReport)> = join_all(runs).await.into_iter().flatten().collect();
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, report)| report).collect()
}

/// Job indices grouped by working directory, in first-seen order.
#[must_use]
pub fn group_by_working_dir(jobs: &[(&Scenario, ScenarioConfig)]) -> Vec<Vec<usize>> {
    let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
    for (i, (_, config)) in jobs.iter().enumerate() {
        match groups.iter_mut().find(|(dir, _)| *dir == config.working_dir) {
            Some((_, members)) => members.push(i),
            None => groups.push((config.working_dir.clone(), vec![i])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}
