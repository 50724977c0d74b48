use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::network::{AddressClass, classify};

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Result of a network security check against one host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub host: String,
    pub resolved_addresses: BTreeSet<IpAddr>,
    pub verdict: Verdict,
    pub reason: String,
}

impl Finding {
    /// Classify every resolved address of `host` and build the finding.
    ///
    /// The verdict is `Fail` as soon as one address is public; the reason
    /// lists every public address found.
    #[must_use]
    pub fn from_resolution(host: impl Into<String>, resolved: BTreeSet<IpAddr>) -> Self {
        let host = host.into();
        let public: Vec<String> = resolved
            .iter()
            .filter(|ip| classify(**ip) == AddressClass::Public)
            .map(ToString::to_string)
            .collect();
        let (verdict, reason) = if public.is_empty() {
            (
                Verdict::Pass,
                format!("all {} resolved address(es) are private", resolved.len()),
            )
        } else {
            (
                Verdict::Fail,
                format!("public address(es): {}", public.join(", ")),
            )
        };
        Self {
            host,
            resolved_addresses: resolved,
            verdict,
            reason,
        }
    }

    /// First (lowest-ordered) public address, if any.
    #[must_use]
    pub fn first_public(&self) -> Option<IpAddr> {
        self.resolved_addresses
            .iter()
            .copied()
            .find(|ip| classify(*ip) == AddressClass::Public)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Resource actions reported by a plan or apply.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSummary {
    pub add: u32,
    pub change: u32,
    pub destroy: u32,
}

impl ChangeSummary {
    #[must_use]
    pub fn new(add: u32, change: u32, destroy: u32) -> Self {
        Self {
            add,
            change,
            destroy,
        }
    }

    /// `true` when no resource would be added, changed or destroyed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.add + self.change + self.destroy
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to destroy",
            self.add, self.change, self.destroy
        )
    }
}
