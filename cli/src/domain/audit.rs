//! Static audits over plan renderings and project files.
//!
//! Every check takes already-read text and returns the violations it found.
//! Reading the files and running the tool is the audit service's job.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use infraguard_common::Cidr;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static PLANNED_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\+\s*resource\s+"([^"]+)"\s+"([^"]+)"\s+\{"#).expect("valid regex")
});

/// Text rendered by the tool in place of a sensitive value.
pub const SENSITIVE_MARKER: &str = "(sensitive value)";

/// Which audit produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCheck {
    SensitiveAttributes,
    SubnetRange,
    ModulePins,
    ReadmeSection,
}

impl fmt::Display for AuditCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SensitiveAttributes => "sensitive attributes",
            Self::SubnetRange => "subnet range",
            Self::ModulePins => "module pins",
            Self::ReadmeSection => "readme section",
        })
    }
}

/// One audit failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditViolation {
    pub check: AuditCheck,
    pub message: String,
}

impl AuditViolation {
    fn new(check: AuditCheck, message: impl Into<String>) -> Self {
        Self {
            check,
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.message)
    }
}

/// Result of a full audit run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub checks: Vec<AuditCheck>,
    pub violations: Vec<AuditViolation>,
}

impl AuditReport {
    /// Record that `check` ran and add what it found.
    pub fn record(&mut self, check: AuditCheck, found: Vec<AuditViolation>) {
        self.checks.push(check);
        self.violations.extend(found);
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations raised by `check`.
    pub fn violations_for(&self, check: AuditCheck) -> impl Iterator<Item = &AuditViolation> {
        self.violations.iter().filter(move |v| v.check == check)
    }
}

// ── Checks ────────────────────────────────────────────────────────────────────

/// Every planned attribute in `attributes` must render as `(sensitive value)`.
///
/// `plan_text` is the human-readable plan (`show -no-color`). Violations name
/// the enclosing planned resource.
#[must_use]
pub fn check_sensitive_attributes(plan_text: &str, attributes: &[String]) -> Vec<AuditViolation> {
    let matchers: Vec<(&str, Regex)> = attributes
        .iter()
        .filter_map(|attr| {
            Regex::new(&format!(r"^\s*\+\s*{}\s+=\s", regex::escape(attr)))
                .ok()
                .map(|re| (attr.as_str(), re))
        })
        .collect();

    let mut resource: Option<String> = None;
    let mut violations = Vec::new();
    for line in plan_text.lines() {
        if let Some(caps) = PLANNED_RESOURCE.captures(line) {
            resource = Some(format!("{}.{}", &caps[1], &caps[2]));
        }
        for (attr, re) in &matchers {
            if re.is_match(line) && !line.contains(SENSITIVE_MARKER) {
                violations.push(AuditViolation::new(
                    AuditCheck::SensitiveAttributes,
                    format!(
                        "attribute '{attr}' of {} is not marked sensitive",
                        resource.as_deref().unwrap_or("<unknown resource>")
                    ),
                ));
            }
        }
    }
    violations
}

/// Every resource whose address contains `prefix` must declare a
/// `cidr_block` inside `range`.
///
/// `plan_json` is the JSON plan (`show -json`); the whole document is walked.
#[must_use]
pub fn check_subnet_ranges(plan_json: &Value, prefix: &str, range: &Cidr) -> Vec<AuditViolation> {
    let mut violations = Vec::new();
    walk_subnets(plan_json, prefix, range, &mut violations);
    violations
}

fn walk_subnets(node: &Value, prefix: &str, range: &Cidr, out: &mut Vec<AuditViolation>) {
    match node {
        Value::Object(map) => {
            if let Some(address) = map.get("address").and_then(Value::as_str) {
                if address.contains(prefix) {
                    if let Some(block) = map
                        .get("values")
                        .and_then(|v| v.get("cidr_block"))
                        .and_then(Value::as_str)
                    {
                        check_block(address, block, range, out);
                    }
                }
            }
            for child in map.values() {
                walk_subnets(child, prefix, range, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk_subnets(child, prefix, range, out);
            }
        }
        _ => {}
    }
}

fn check_block(address: &str, block: &str, range: &Cidr, out: &mut Vec<AuditViolation>) {
    match block.parse::<Cidr>() {
        Ok(cidr) if cidr.is_subnet_of(range) => {}
        Ok(_) => out.push(AuditViolation::new(
            AuditCheck::SubnetRange,
            format!("CIDR block {block} of {address} is not within {range}"),
        )),
        Err(e) => out.push(AuditViolation::new(
            AuditCheck::SubnetRange,
            format!("CIDR block '{block}' of {address} is invalid: {e}"),
        )),
    }
}

/// Each pinned module key must be installed at the pinned version.
///
/// `modules_json` is the content of `.terraform/modules/modules.json`, or
/// `None` if the file is missing.
#[must_use]
pub fn check_module_pins(
    modules_json: Option<&str>,
    pins: &BTreeMap<String, String>,
) -> Vec<AuditViolation> {
    if pins.is_empty() {
        return Vec::new();
    }
    let Some(text) = modules_json else {
        return vec![AuditViolation::new(
            AuditCheck::ModulePins,
            ".terraform/modules/modules.json not found; run init first",
        )];
    };
    let manifest: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            return vec![AuditViolation::new(
                AuditCheck::ModulePins,
                format!("modules.json is not valid JSON: {e}"),
            )];
        }
    };
    let installed: Vec<(&str, &str)> = manifest
        .get("Modules")
        .and_then(Value::as_array)
        .map(|mods| {
            mods.iter()
                .filter_map(|m| {
                    let key = m.get("Key")?.as_str()?;
                    let version = m.get("Version").and_then(Value::as_str).unwrap_or("");
                    Some((key, version))
                })
                .collect()
        })
        .unwrap_or_default();

    pins.iter()
        .filter_map(|(module, expected)| {
            match installed.iter().find(|(key, _)| *key == module.as_str()) {
                None => Some(AuditViolation::new(
                    AuditCheck::ModulePins,
                    format!("module '{module}' not found in modules.json"),
                )),
                Some((_, found)) if *found != expected.as_str() => Some(AuditViolation::new(
                    AuditCheck::ModulePins,
                    format!("expected {module} {expected}, but found {found}"),
                )),
                Some(_) => None,
            }
        })
        .collect()
}

/// The readme must exist and contain a `## <section>` heading.
///
/// Matching is case-insensitive; `readme` is `None` if no `readme.md` exists.
#[must_use]
pub fn check_readme_section(readme: Option<&str>, section: &str) -> Vec<AuditViolation> {
    let Some(content) = readme else {
        return vec![AuditViolation::new(
            AuditCheck::ReadmeSection,
            "readme.md not found in the working directory",
        )];
    };
    let heading = Regex::new(&format!(r"(?i)##\s*{}", regex::escape(section)));
    match heading {
        Ok(re) if re.is_match(content) => Vec::new(),
        _ => vec![AuditViolation::new(
            AuditCheck::ReadmeSection,
            format!("readme.md has no '## {section}' section"),
        )],
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
