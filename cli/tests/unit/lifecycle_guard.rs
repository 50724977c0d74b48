//! Unit tests for `with_teardown`: destroy runs exactly once whatever the
//! body does, and teardown failures never hide the body result.

#![allow(clippy::expect_used)]

use infraguard_cli::application::services::lifecycle::{BodyError, with_teardown};
use infraguard_cli::application::services::provisioning::ProvisioningDriver;
use infraguard_cli::domain::HarnessError;

use crate::helpers::{config, err_output};
use crate::mocks::MockTool;

#[tokio::test]
async fn test_teardown_runs_once_after_success() {
    let tool = MockTool::new();
    let cfg = config();
    let driver = ProvisioningDriver::new(&tool, &cfg);

    let guarded = with_teardown(&driver, |d| async move {
        d.init().await?;
        d.apply().await.map(|_| 42)
    })
    .await;

    assert_eq!(guarded.body, Ok(42));
    assert!(guarded.teardown.is_ok());
    assert_eq!(tool.calls(), vec!["init", "apply", "destroy"]);
}

#[tokio::test]
async fn test_teardown_runs_once_after_body_error() {
    let tool = MockTool::new().script("apply", vec![err_output(1, b"Error: boom")]);
    let cfg = config();
    let driver = ProvisioningDriver::new(&tool, &cfg);

    let guarded = with_teardown(&driver, |d| async move { d.apply().await }).await;

    assert!(matches!(
        guarded.body,
        Err(BodyError::Failed(HarnessError::Apply { .. }))
    ));
    assert_eq!(tool.count("destroy"), 1);
}

#[tokio::test]
async fn test_teardown_runs_once_after_panic() {
    let tool = MockTool::new();
    let cfg = config();
    let driver = ProvisioningDriver::new(&tool, &cfg);

    let guarded = with_teardown(&driver, |d| async move {
        d.init().await?;
        if d.config().retry.max_retries == 0 {
            panic!("assertion exploded");
        }
        Ok::<(), HarnessError>(())
    })
    .await;

    assert_eq!(
        guarded.body,
        Err(BodyError::Panicked("assertion exploded".to_string()))
    );
    assert_eq!(tool.count("destroy"), 1);
}

#[tokio::test]
async fn test_teardown_failure_is_reported_beside_body_error() {
    let tool = MockTool::new()
        .script("init", vec![err_output(1, b"Error: backend unreachable")])
        .script("destroy", vec![err_output(1, b"Error: DependencyViolation")]);
    let cfg = config();
    let driver = ProvisioningDriver::new(&tool, &cfg);

    let guarded = with_teardown(&driver, |d| async move { d.init().await }).await;

    assert!(matches!(
        guarded.body,
        Err(BodyError::Failed(HarnessError::Init { .. }))
    ));
    assert!(matches!(
        guarded.teardown,
        Err(HarnessError::Destroy { attempts: 1, .. })
    ));
    assert_eq!(tool.count("destroy"), 1);
}

#[tokio::test]
async fn test_teardown_failure_after_successful_body() {
    let tool = MockTool::new().script("destroy", vec![err_output(1, b"Error: timeout")]);
    let cfg = config();
    let driver = ProvisioningDriver::new(&tool, &cfg);

    let guarded = with_teardown(&driver, |_| async { Ok::<_, HarnessError>("done") }).await;

    assert_eq!(guarded.body, Ok("done"));
    assert!(guarded.teardown.is_err());
}
