//! docfactory QA common library
//!
//! The pure half of the harness: typed wire and artifact records, the
//! content metric extractors, pattern rule tables and one verifier per
//! service contract. Nothing in this crate performs I/O; callers hand it
//! bytes and observation records, and it hands back [`Verdict`]s.

pub mod artifact;
pub mod error;
pub mod gates;
pub mod lenient;
pub mod metrics;
pub mod request;
pub mod response;
pub mod rules;
pub mod ui;
pub mod verdict;

// Re-export commonly used types
pub use artifact::{
    Absence, ArtifactDigests, ExportAudit, JobArtifactSet, Layout, Page, ReferenceIndex, Resolved,
};
pub use error::{Error, Result};
pub use gates::GateMarkers;
pub use metrics::{DensityFloor, DensityPolicy};
pub use request::{ExportRequest, PageSize, TriggerQuery};
pub use response::{ExportOutcome, ExportResponse};
pub use rules::{RuleSource, RuleTable};
pub use ui::{PageObservation, QualityScan};
pub use verdict::{Check, GateKind, Verdict};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
