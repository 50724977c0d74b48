//! Retryable-error classification for provisioning tool failures.
//!
//! A `RetryTable` is an ordered list of `(pattern, reason)` rules matched
//! against the combined stdout/stderr of a failed tool run. The first rule
//! whose pattern matches classifies the failure as transient; no match means
//! the failure is fatal.

use std::time::Duration;

use regex::Regex;

use crate::domain::error::ConfigError;

/// Known transient Terraform and provider failures, in evaluation order.
pub const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (
        ".*read: connection reset by peer.*",
        "Failed to reach helm charts repository.",
    ),
    (".*transport is closing.*", "Failed to reach Kubernetes API."),
    (
        ".*unable to verify signature.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*unable to verify checksum.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*no provider exists with the given name.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*registry service is unreachable.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*Error installing provider.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*Failed to query available provider packages.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*timeout while waiting for plugin to start.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*timed out waiting for server handshake.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        "could not query provider registry for",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        ".*Provider produced inconsistent result after apply.*",
        "Provider eventual consistency error.",
    ),
    (
        "(?i).*(Throttling|Rate exceeded|RequestLimitExceeded|TooManyRequests).*",
        "Provider API throttling.",
    ),
    (
        ".*Error acquiring the state lock.*",
        "State lock held by another operation.",
    ),
];

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_TIME_BETWEEN_RETRIES: Duration = Duration::from_secs(5);

// ── Retry table ───────────────────────────────────────────────────────────────

/// One classification rule.
#[derive(Debug, Clone)]
pub struct RetryRule {
    pub pattern: Regex,
    pub reason: String,
}

/// Ordered retry classification rules.
#[derive(Debug, Clone, Default)]
pub struct RetryTable {
    rules: Vec<RetryRule>,
}

impl RetryTable {
    /// An empty table: every failure is fatal.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of [`DEFAULT_RETRYABLE_ERRORS`].
    #[must_use]
    #[allow(clippy::expect_used)] // Patterns are compile-time constants
    pub fn defaults() -> Self {
        Self::from_pairs(DEFAULT_RETRYABLE_ERRORS.iter().copied())
            .expect("built-in retryable error patterns are valid regexes")
    }

    /// Build a table from `(pattern, reason)` pairs, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPattern`] for the first pattern that
    /// is not a valid regex.
    pub fn from_pairs<P, R>(pairs: impl IntoIterator<Item = (P, R)>) -> Result<Self, ConfigError>
    where
        P: AsRef<str>,
        R: Into<String>,
    {
        let mut table = Self::empty();
        for (pattern, reason) in pairs {
            table.push(pattern.as_ref(), reason)?;
        }
        Ok(table)
    }

    /// Append a rule after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPattern`] if `pattern` is not a valid regex.
    pub fn push(&mut self, pattern: &str, reason: impl Into<String>) -> Result<(), ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidRetryPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.rules.push(RetryRule {
            pattern: regex,
            reason: reason.into(),
        });
        Ok(())
    }

    /// Return the reason of the first rule matching `output`, if any.
    #[must_use]
    pub fn classify(&self, output: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(output))
            .map(|rule| rule.reason.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &RetryRule> {
        self.rules.iter()
    }
}

// ── Retry policy ──────────────────────────────────────────────────────────────

/// Fixed-interval retry bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Pause between consecutive attempts.
    pub time_between_retries: Duration,
}

impl RetryPolicy {
    /// Total attempts including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            time_between_retries: DEFAULT_TIME_BETWEEN_RETRIES,
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
