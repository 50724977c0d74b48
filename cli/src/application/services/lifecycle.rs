//! Scoped teardown: run a body against provisioned infrastructure, then
//! destroy it exactly once.
//!
//! Async work cannot run in `Drop`, so the guard is an explicit async
//! combinator. `Drop` is only used to report a guard that never reached
//! teardown (its future was cancelled).

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use futures_util::FutureExt as _;

use crate::application::ports::ProvisioningTool;
use crate::application::services::provisioning::ProvisioningDriver;
use crate::domain::HarnessError;

/// How the guarded body ended when it did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError<E> {
    /// The body returned an error.
    Failed(E),
    /// The body panicked; the payload message is kept.
    Panicked(String),
}

/// Results of the body and of the teardown, side by side.
#[derive(Debug)]
pub struct Guarded<R, E> {
    pub body: Result<R, BodyError<E>>,
    pub teardown: Result<(), HarnessError>,
}

/// Logs an error if dropped while still armed.
struct TeardownToken {
    working_dir: PathBuf,
    armed: bool,
}

impl TeardownToken {
    fn armed(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TeardownToken {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!(
                dir = %self.working_dir.display(),
                "scenario dropped before teardown; provisioned resources may be left behind"
            );
        }
    }
}

/// Run `body(driver)` and then `driver.destroy()`, whatever the body did.
///
/// Destroy runs exactly once when the body returns `Ok`, returns `Err`, or
/// panics. A teardown failure is reported next to the body result and never
/// replaces it.
pub async fn with_teardown<'d, 'a, T, R, E, F, Fut>(
    driver: &'d ProvisioningDriver<'a, T>,
    body: F,
) -> Guarded<R, E>
where
    T: ProvisioningTool,
    F: FnOnce(&'d ProvisioningDriver<'a, T>) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let token = TeardownToken::armed(driver.config().working_dir.clone());

    // Calling `body` inside the future puts a synchronous panic under
    // `catch_unwind` too.
    let guarded_body = AssertUnwindSafe(async move { body(driver).await }).catch_unwind();
    let body = match guarded_body.await {
        Ok(result) => result.map_err(BodyError::Failed),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "scenario body panicked");
            Err(BodyError::Panicked(message))
        }
    };

    let teardown = driver.destroy().await;
    if let Err(e) = &teardown {
        tracing::error!(error = %e, "teardown failed");
    }
    token.disarm();

    Guarded { body, teardown }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
