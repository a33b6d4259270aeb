//! Gate verifiers
//!
//! One module per service contract. Each exposes an observation record (what
//! the scenario collected) and a pure `verify` that turns it into a
//! [`Verdict`]. Verifiers never fail; a broken contract is a failing check.
//!
//! ```text
//! scenario ──► Observation ──► verify() ──► Verdict { checks, evidence }
//! ```

pub mod completeness;
pub mod copy_density;
pub mod determinism;
pub mod domain_copy;
pub mod export_size;
pub mod internal_terms;
pub mod isolation;
pub mod layout_density;
pub mod reference_freshness;
pub mod reference_source;
pub mod ui_runtime;
pub mod variant;

use serde::{Deserialize, Serialize};

use crate::response::ExportResponse;
use crate::verdict::VerdictBuilder;

/// Service messages and codes the gates look for. Substring matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateMarkers {
    /// Value a passing gate header carries.
    pub header_pass: String,
    /// Page validation code for thin layouts.
    pub content_density_code: String,
    pub internal_term_leakage: String,
    pub style_source_violation: String,
    pub layout_source_violation: String,
    pub stale_reference_index: String,
}

impl Default for GateMarkers {
    fn default() -> Self {
        Self {
            header_pass: "pass".to_string(),
            content_density_code: "content-density".to_string(),
            internal_term_leakage: "internal term leakage detected".to_string(),
            style_source_violation: "stylePreset.source must be references".to_string(),
            layout_source_violation: "layoutPlan.source must be references".to_string(),
            stale_reference_index: "reference index must be fresh".to_string(),
        }
    }
}

/// Record a 2xx check for `response`.
pub(crate) fn check_success(builder: &mut VerdictBuilder, name: &str, response: &ExportResponse) -> bool {
    builder.check(name, response.is_success(), 200, response.status)
}

/// Record a 4xx check for `response`.
pub(crate) fn check_client_error(builder: &mut VerdictBuilder, name: &str, response: &ExportResponse) -> bool {
    builder.check(name, response.is_client_error(), "4xx", response.status)
}
