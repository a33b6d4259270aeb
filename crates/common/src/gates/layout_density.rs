//! Layout density: a multi-page brochure fills its pages. Checks page
//! count, the service's own `content-density` validation and the per-class
//! density floors.

use serde::Serialize;

use super::GateMarkers;
use crate::artifact::{Layout, Resolved};
use crate::metrics::{self, DensityPolicy, LayoutDensity};
use crate::verdict::{GateKind, Verdict};

/// Pages a density run must produce.
pub const DEFAULT_MIN_PAGES: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct LayoutDensityObservation {
    /// Job directory the layout was read from.
    pub request_hash: Option<String>,
    pub layout: Resolved<Layout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityFailure {
    #[serde(flatten)]
    pub density: LayoutDensity,
    pub reason: String,
}

pub fn verify(
    observation: &LayoutDensityObservation,
    policy: &DensityPolicy,
    min_pages: usize,
    markers: &GateMarkers,
) -> Verdict {
    let mut verdict = Verdict::builder(GateKind::LayoutDensity);
    let pages = observation
        .layout
        .present()
        .map(|layout| layout.pages.as_slice())
        .unwrap_or_default();

    verdict.check("layout resolved", observation.layout.is_present(), "present", observation.layout.is_present());
    verdict.check("minimum pages", pages.len() >= min_pages, min_pages, pages.len());

    let flagged: Vec<Option<u32>> = pages
        .iter()
        .filter(|page| page.has_issue_code(&markers.content_density_code))
        .map(|page| page.page_number)
        .collect();
    verdict.check(
        "no service density issues",
        flagged.is_empty(),
        format!("no '{}' page issues", markers.content_density_code),
        &flagged,
    );

    let densities: Vec<LayoutDensity> = pages.iter().map(metrics::layout_density).collect();
    let failures: Vec<DensityFailure> = densities
        .iter()
        .filter_map(|density| {
            policy.shortfall(density).map(|reason| DensityFailure {
                density: density.clone(),
                reason,
            })
        })
        .collect();
    verdict.check("every page meets density floor", failures.is_empty(), policy, &failures);

    verdict
        .evidence("request_hash", &observation.request_hash)
        .evidence("densities", &densities);
    if let Resolved::Absent(absence) = &observation.layout {
        verdict.evidence("layout_absent", absence);
    }
    verdict.finish()
}
