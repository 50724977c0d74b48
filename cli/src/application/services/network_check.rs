//! Network security check: an endpoint must resolve only to private addresses.

use std::collections::BTreeSet;
use std::net::IpAddr;

use infraguard_common::Finding;

use crate::application::ports::HostResolver;
use crate::domain::HarnessError;

/// Resolve `host` to the full set of its addresses.
///
/// # Errors
///
/// Returns [`HarnessError::Resolution`] when the lookup fails, times out, or
/// yields no address.
pub async fn resolve_all(
    resolver: &impl HostResolver,
    host: &str,
) -> Result<BTreeSet<IpAddr>, HarnessError> {
    let addresses = resolver
        .lookup(host)
        .await
        .map_err(|e| HarnessError::Resolution {
            host: host.to_string(),
            reason: format!("{e:#}"),
        })?;
    let set: BTreeSet<IpAddr> = addresses.into_iter().collect();
    if set.is_empty() {
        return Err(HarnessError::Resolution {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        });
    }
    tracing::debug!(host, count = set.len(), "resolved");
    Ok(set)
}

/// Resolve `host` and classify every address.
///
/// # Errors
///
/// Returns [`HarnessError::Resolution`] if `host` cannot be resolved. A public
/// address is not an error here; see [`enforce_private`].
pub async fn check_host(resolver: &impl HostResolver, host: &str) -> Result<Finding, HarnessError> {
    let addresses = resolve_all(resolver, host).await?;
    Ok(Finding::from_resolution(host, addresses))
}

/// Turn a failing finding into a security violation naming the first public address.
///
/// # Errors
///
/// Returns [`HarnessError::SecurityViolation`] if any address is public.
pub fn enforce_private(finding: &Finding) -> Result<(), HarnessError> {
    match finding.first_public() {
        Some(address) => Err(HarnessError::SecurityViolation {
            host: finding.host.clone(),
            address,
        }),
        None => Ok(()),
    }
}
