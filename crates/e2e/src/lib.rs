//! docfactory QA runner
//!
//! The I/O half of the harness. It drives a running docfactory service
//! through its public surface and feeds what it sees to the verifiers in
//! `docfactory-qa-common`:
//! - Regeneration trigger and export calls over HTTP
//! - Job artifacts and the reference index read from the service checkout
//! - The control page inspected through Playwright
//! - A static scan of the service sources
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  QA Case Runner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CaseRunner                                                 │
//! │    ├── DocService (HttpTransport) -> ExportOutcome          │
//! │    ├── ArtifactResolver -> Resolved<Layout | Audit | Index> │
//! │    ├── PageInspector (BrowserInspector) -> PageObservation  │
//! │    ├── SourceScanner -> ScanSummary                         │
//! │    └── run_case(spec: CaseSpec) -> CaseReport               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CaseSpec (YAML or built-in catalog)                        │
//! │    ├── name, description, tags                              │
//! │    └── gate + scenario parameters                           │
//! │          ├── case: TestCase (job id, seed, prompt, size..)  │
//! │          └── thresholds / alternate variant / blocked size  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scan;
pub mod scenarios;
pub mod spec;

pub use artifacts::ArtifactResolver;
pub use client::{DocService, HttpTransport};
pub use config::QaConfig;
pub use error::{QaError, QaResult};
pub use playwright::{BrowserInspector, InspectOptions, PageInspector};
pub use report::{CaseReport, Report};
pub use runner::CaseRunner;
pub use spec::{CaseSpec, Scenario, TestCase};
