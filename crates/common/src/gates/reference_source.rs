//! Reference provenance: with reference usage switched off the export must
//! be rejected for both style and layout provenance; with it on the same
//! export succeeds.

use serde::Serialize;

use super::{check_client_error, check_success, GateMarkers};
use crate::response::{ExportResponse, HEADER_REFERENCE_USAGE};
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSourceObservation {
    /// Export sent with reference usage disabled.
    pub blocked: ExportResponse,
    /// The same export without the flag.
    pub allowed: ExportResponse,
}

pub fn verify(observation: &ReferenceSourceObservation, markers: &GateMarkers) -> Verdict {
    let ReferenceSourceObservation { blocked, allowed } = observation;
    let mut verdict = Verdict::builder(GateKind::ReferenceSource);

    check_client_error(&mut verdict, "disabled references rejected", blocked);

    let messages = blocked.issue_messages();
    verdict.check(
        "style provenance violation reported",
        blocked.has_issue_containing(&markers.style_source_violation),
        &markers.style_source_violation,
        &messages,
    );
    verdict.check(
        "layout provenance violation reported",
        blocked.has_issue_containing(&markers.layout_source_violation),
        &markers.layout_source_violation,
        &messages,
    );

    check_success(&mut verdict, "enabled references accepted", allowed);

    verdict
        .evidence("blocked", blocked.summary())
        .evidence("blocked_body", &blocked.body)
        .evidence("allowed", allowed.summary())
        .evidence("allowed_reference_usage", allowed.header(HEADER_REFERENCE_USAGE));
    verdict.finish()
}
