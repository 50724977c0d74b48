//! Infrastructure implementation of the `HostResolver` port.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::HostResolver;

/// System resolver via `tokio::net::lookup_host`, bounded by a timeout.
#[derive(Debug, Clone, Copy)]
pub struct TokioResolver {
    timeout: Duration,
}

impl TokioResolver {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HostResolver for TokioResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| anyhow::anyhow!("lookup timed out after {}s", self.timeout.as_secs()))?
            .with_context(|| format!("lookup of {host}"))?;
        Ok(addrs.map(|sa| sa.ip()).collect())
    }
}
