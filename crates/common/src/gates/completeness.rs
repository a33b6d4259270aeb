//! Content completeness: every exported page has a title and body copy, and
//! the service's own completeness headers agree.

use serde::Serialize;

use super::{check_success, GateMarkers};
use crate::artifact::{Layout, Resolved};
use crate::metrics::{self, Completeness};
use crate::response::{ExportResponse, HEADER_CONTENT_COMPLETENESS, HEADER_CONTENT_INTERNAL_TERMS};
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct CompletenessObservation {
    pub response: ExportResponse,
    pub layout: Resolved<Layout>,
}

pub fn verify(observation: &CompletenessObservation, markers: &GateMarkers) -> Verdict {
    let response = &observation.response;
    let mut verdict = Verdict::builder(GateKind::ContentCompleteness);

    check_success(&mut verdict, "export succeeded", response);

    let pages: Vec<Completeness> = observation
        .layout
        .present()
        .map(|layout| layout.pages.iter().map(metrics::completeness).collect())
        .unwrap_or_default();

    verdict.check("pages produced", !pages.is_empty(), ">= 1", pages.len());

    let incomplete: Vec<&Completeness> = pages.iter().filter(|page| !page.satisfied()).collect();
    verdict.check(
        "every page has title and body",
        !pages.is_empty() && incomplete.is_empty(),
        "title >= 1 and body_or_callout >= 1 on every page",
        &incomplete,
    );

    let completeness = response.header(HEADER_CONTENT_COMPLETENESS);
    let internal_terms = response.header(HEADER_CONTENT_INTERNAL_TERMS);
    if completeness.is_some() || internal_terms.is_some() {
        let pass = Some(markers.header_pass.as_str());
        verdict.check(
            "service gate headers pass",
            completeness == pass && internal_terms == pass,
            [&markers.header_pass, &markers.header_pass],
            [completeness, internal_terms],
        );
    }

    verdict
        .evidence("export", response.summary())
        .evidence("pages", &pages)
        .evidence("page_error_codes", response.page_error_codes());
    if let Resolved::Absent(absence) = &observation.layout {
        verdict.evidence("layout_absent", absence);
    }
    verdict.finish()
}
