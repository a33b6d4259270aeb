//! Run report
//!
//! One JSON document per run: a case entry per executed case, carrying
//! either its verdict or the fault that stopped it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docfactory_qa_common::{GateKind, Verdict};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::QaResult;

pub const REPORT_FILE: &str = "qa-report.json";

/// Outcome of one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub gate: GateKind,
    pub passed: bool,
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,

    /// Transport or harness fault; set iff `verdict` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl CaseReport {
    pub fn from_verdict(name: &str, verdict: Verdict, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            gate: verdict.gate,
            passed: verdict.passed,
            duration_ms,
            verdict: Some(verdict),
            fault: None,
        }
    }

    pub fn from_fault(name: &str, gate: GateKind, fault: String, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            gate,
            passed: false,
            duration_ms,
            verdict: None,
            fault: Some(fault),
        }
    }

    /// One-line reason for a failed case.
    pub fn failure_summary(&self) -> String {
        if let Some(fault) = &self.fault {
            return fault.clone();
        }
        let failed: Vec<&str> = self
            .verdict
            .iter()
            .flat_map(|v| v.failed_checks())
            .map(|check| check.name.as_str())
            .collect();
        if failed.is_empty() {
            "no checks recorded".to_string()
        } else {
            format!("failed: {}", failed.join(", "))
        }
    }
}

/// Aggregate of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub base_url: String,
    pub harness_version: String,
    pub passed: bool,
    pub total: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub duration_ms: u64,
    pub results: Vec<CaseReport>,
}

impl Report {
    /// Passes iff there is at least one case and every case passed.
    pub fn new(base_url: &str, results: Vec<CaseReport>, duration_ms: u64) -> Self {
        let passed_count = results.iter().filter(|r| r.passed).count();
        let total = results.len();
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            base_url: base_url.to_string(),
            harness_version: docfactory_qa_common::VERSION.to_string(),
            passed: total > 0 && passed_count == total,
            total,
            passed_count,
            failed_count: total - passed_count,
            duration_ms,
            results,
        }
    }

    pub fn to_json(&self) -> QaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `{output_dir}/qa-report.json`.
    pub fn write(&self, output_dir: &Path) -> QaResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(REPORT_FILE);
        std::fs::write(&path, self.to_json()?)?;
        info!("Report written to: {}", path.display());
        Ok(path)
    }
}
