//! Gate verdicts
//!
//! A [`Verdict`] is the only output of a gate verifier. It lists every named
//! check with what was expected and what was observed, plus free-form
//! evidence for the report.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The service contracts this harness verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Determinism,
    VariantSensitivity,
    JobIsolation,
    ContentCompleteness,
    CopyDensity,
    LayoutDensity,
    InternalTerms,
    ReferenceSource,
    ReferenceFreshness,
    ExportSize,
    UiRuntime,
    DomainCopy,
}

impl GateKind {
    pub const ALL: [GateKind; 12] = [
        GateKind::Determinism,
        GateKind::VariantSensitivity,
        GateKind::JobIsolation,
        GateKind::ContentCompleteness,
        GateKind::CopyDensity,
        GateKind::LayoutDensity,
        GateKind::InternalTerms,
        GateKind::ReferenceSource,
        GateKind::ReferenceFreshness,
        GateKind::ExportSize,
        GateKind::UiRuntime,
        GateKind::DomainCopy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Determinism => "determinism",
            GateKind::VariantSensitivity => "variant_sensitivity",
            GateKind::JobIsolation => "job_isolation",
            GateKind::ContentCompleteness => "content_completeness",
            GateKind::CopyDensity => "copy_density",
            GateKind::LayoutDensity => "layout_density",
            GateKind::InternalTerms => "internal_terms",
            GateKind::ReferenceSource => "reference_source",
            GateKind::ReferenceFreshness => "reference_freshness",
            GateKind::ExportSize => "export_size",
            GateKind::UiRuntime => "ui_runtime",
            GateKind::DomainCopy => "domain_copy",
        }
    }

    /// Whether the gate needs a running service (everything but the static scan).
    pub fn needs_service(&self) -> bool {
        !matches!(self, GateKind::DomainCopy)
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub expected: Value,
    pub observed: Value,
}

/// Outcome of one gate verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub gate: GateKind,
    pub passed: bool,
    pub checks: Vec<Check>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub evidence: Value,
}

impl Verdict {
    pub fn builder(gate: GateKind) -> VerdictBuilder {
        VerdictBuilder {
            gate,
            checks: Vec::new(),
            evidence: Map::new(),
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|check| !check.passed)
    }

    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|check| check.name == name)
    }
}

/// Accumulates checks and evidence for a [`Verdict`].
#[derive(Debug)]
pub struct VerdictBuilder {
    gate: GateKind,
    checks: Vec<Check>,
    evidence: Map<String, Value>,
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl VerdictBuilder {
    /// Record a check. Returns `passed` so callers can chain dependent logic.
    pub fn check(
        &mut self,
        name: &str,
        passed: bool,
        expected: impl Serialize,
        observed: impl Serialize,
    ) -> bool {
        self.checks.push(Check {
            name: name.to_string(),
            passed,
            expected: to_value(expected),
            observed: to_value(observed),
        });
        passed
    }

    /// Record `observed == expected`.
    pub fn check_eq<T: Serialize + PartialEq>(&mut self, name: &str, expected: T, observed: T) -> bool {
        let passed = expected == observed;
        self.check(name, passed, expected, observed)
    }

    pub fn evidence(&mut self, key: &str, value: impl Serialize) -> &mut Self {
        self.evidence.insert(key.to_string(), to_value(value));
        self
    }

    /// A verdict with no checks fails.
    pub fn finish(self) -> Verdict {
        let passed = !self.checks.is_empty() && self.checks.iter().all(|check| check.passed);
        let evidence = if self.evidence.is_empty() {
            Value::Null
        } else {
            Value::Object(self.evidence)
        };
        Verdict {
            gate: self.gate,
            passed,
            checks: self.checks,
            evidence,
        }
    }
}
