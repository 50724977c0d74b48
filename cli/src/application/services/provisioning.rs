//! Provisioning driver: the tool's lifecycle verbs with retry classification.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::future::Future;
use std::path::Path;
use std::process::Output;
use std::time::Instant;

use infraguard_common::ChangeSummary;

use crate::application::ports::ProvisioningTool;
use crate::domain::tool_output::{
    combined_output, parse_apply_summary, parse_destroy_count, parse_output_value,
    parse_plan_summary,
};
use crate::domain::{HarnessError, ScenarioConfig};

/// Exit code of `plan -detailed-exitcode` when changes are pending.
pub const PLAN_EXIT_CHANGES: i32 = 2;

/// Outcome of a successful plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanResult {
    pub summary: ChangeSummary,
    /// The tool reported pending changes (detailed exit code 2).
    pub changes_pending: bool,
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RetryFailure {
    retryable: bool,
    attempts: u32,
    detail: String,
}

/// Drives one provisioning tool against one immutable [`ScenarioConfig`].
pub struct ProvisioningDriver<'a, T: ProvisioningTool> {
    tool: &'a T,
    config: &'a ScenarioConfig,
    retry_until: Option<Instant>,
}

impl<'a, T: ProvisioningTool> ProvisioningDriver<'a, T> {
    #[must_use]
    pub fn new(tool: &'a T, config: &'a ScenarioConfig) -> Self {
        Self {
            tool,
            config,
            retry_until: None,
        }
    }

    /// Stop scheduling apply and plan retries once `at` would be passed.
    /// A running attempt is never interrupted, and destroy keeps retrying.
    #[must_use]
    pub fn with_retry_deadline(mut self, at: Instant) -> Self {
        self.retry_until = Some(at);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ScenarioConfig {
        self.config
    }

    /// Initialise the working directory. Not retried.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Init`] on spawn failure or non-zero exit.
    pub async fn init(&self) -> Result<(), HarnessError> {
        tracing::info!(dir = %self.config.working_dir.display(), "init");
        match self.tool.init(self.config).await {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(HarnessError::Init {
                detail: self.detail(&out),
            }),
            Err(e) => Err(HarnessError::Init {
                detail: self.config.mask(&format!("{e:#}")),
            }),
        }
    }

    /// Apply the declaration, retrying classified transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Apply`]: `retryable: false` as soon as an
    /// unclassified failure occurs, `retryable: true` once retries run out.
    pub async fn apply(&self) -> Result<ChangeSummary, HarnessError> {
        tracing::info!(dir = %self.config.working_dir.display(), "apply");
        let out = self
            .retrying(
                "apply",
                self.retry_until,
                || self.tool.apply(self.config),
                |o| o.status.success(),
            )
            .await
            .map_err(|f| HarnessError::Apply {
                retryable: f.retryable,
                attempts: f.attempts,
                detail: f.detail,
            })?;
        let summary = parse_apply_summary(&String::from_utf8_lossy(&out.stdout)).unwrap_or_default();
        tracing::info!(%summary, "apply complete");
        Ok(summary)
    }

    /// Apply, then require a plan against the converged state to be empty.
    ///
    /// # Errors
    ///
    /// Returns the apply error, [`HarnessError::Idempotency`] when the plan
    /// still has changes, or [`HarnessError::Apply`] when the plan itself fails.
    pub async fn apply_and_verify_idempotent(&self) -> Result<ChangeSummary, HarnessError> {
        let applied = self.apply().await?;
        let plan = self.plan(None).await?;
        if plan.changes_pending {
            return Err(HarnessError::Idempotency {
                pending: plan.summary,
            });
        }
        Ok(applied)
    }

    /// Plan with a detailed exit code, optionally saving the plan to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Apply`] when the plan fails (exit code other
    /// than 0 or 2) after retries.
    pub async fn plan(&self, out: Option<&Path>) -> Result<PlanResult, HarnessError> {
        tracing::info!(dir = %self.config.working_dir.display(), "plan");
        let accepted = |o: &Output| o.status.success() || o.status.code() == Some(PLAN_EXIT_CHANGES);
        let output = self
            .retrying("plan", self.retry_until, || self.tool.plan(self.config, out), accepted)
            .await
            .map_err(|f| HarnessError::Apply {
                retryable: f.retryable,
                attempts: f.attempts,
                detail: format!("plan: {}", f.detail),
            })?;
        let changes_pending = output.status.code() == Some(PLAN_EXIT_CHANGES);
        let summary =
            parse_plan_summary(&String::from_utf8_lossy(&output.stdout)).unwrap_or_default();
        Ok(PlanResult {
            summary,
            changes_pending,
        })
    }

    /// Read one output value. Not retried.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::OutputNotFound`] if the tool cannot produce it.
    pub async fn output(&self, name: &str) -> Result<String, HarnessError> {
        tracing::debug!(name, "output");
        match self.tool.output(self.config, name).await {
            Ok(out) if out.status.success() => {
                Ok(parse_output_value(&String::from_utf8_lossy(&out.stdout)))
            }
            Ok(out) => Err(HarnessError::OutputNotFound {
                name: name.to_string(),
                detail: self.detail(&out),
            }),
            Err(e) => Err(HarnessError::OutputNotFound {
                name: name.to_string(),
                detail: self.config.mask(&format!("{e:#}")),
            }),
        }
    }

    /// Destroy everything the working directory manages, retrying with the
    /// same table as apply.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Destroy`] once no attempt succeeded.
    pub async fn destroy(&self) -> Result<(), HarnessError> {
        tracing::info!(dir = %self.config.working_dir.display(), "destroy");
        let out = self
            .retrying(
                "destroy",
                None,
                || self.tool.destroy(self.config),
                |o| o.status.success(),
            )
            .await
            .map_err(|f| HarnessError::Destroy {
                attempts: f.attempts,
                detail: f.detail,
            })?;
        if let Some(count) = parse_destroy_count(&String::from_utf8_lossy(&out.stdout)) {
            tracing::info!(count, "destroy complete");
        }
        Ok(())
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Run `op` until `accept` holds, the failure is unclassified, the
    /// attempts run out, or the next attempt would start past `until`.
    /// Sleeps a fixed interval between attempts.
    async fn retrying<F, Fut>(
        &self,
        verb: &str,
        until: Option<Instant>,
        mut op: F,
        accept: impl Fn(&Output) -> bool,
    ) -> Result<Output, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Output>>,
    {
        let policy = self.config.retry;
        let max_attempts = policy.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let detail = match op().await {
                Ok(out) if accept(&out) => return Ok(out),
                Ok(out) => self.detail(&out),
                Err(e) => self.config.mask(&format!("{e:#}")),
            };

            let Some(reason) = self.config.retryable_errors.classify(&detail) else {
                return Err(RetryFailure {
                    retryable: false,
                    attempts: attempt,
                    detail,
                });
            };
            if attempt >= max_attempts {
                tracing::warn!(verb, attempt, reason, "retryable failure; no retries left");
                return Err(RetryFailure {
                    retryable: true,
                    attempts: attempt,
                    detail,
                });
            }
            if until.is_some_and(|at| Instant::now() + policy.time_between_retries >= at) {
                tracing::warn!(verb, attempt, reason, "retryable failure; scenario deadline reached");
                return Err(RetryFailure {
                    retryable: true,
                    attempts: attempt,
                    detail,
                });
            }
            tracing::warn!(
                verb,
                attempt,
                reason,
                "retryable failure; retrying in {}s",
                policy.time_between_retries.as_secs()
            );
            tokio::time::sleep(policy.time_between_retries).await;
        }
    }

    /// Masked, combined tool output of a failed run.
    fn detail(&self, out: &Output) -> String {
        let text = combined_output(&out.stdout, &out.stderr);
        if text.is_empty() {
            return match out.status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            };
        }
        self.config.mask(&text)
    }
}
