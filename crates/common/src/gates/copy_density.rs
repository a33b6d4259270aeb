//! Copy density: every page carries enough copy, in enough blocks, at a
//! readable body size. Each shortfall is reported on its own.

use serde::{Deserialize, Serialize};

use super::check_success;
use crate::artifact::{Layout, Resolved};
use crate::metrics::{self, CopyDensity};
use crate::response::{
    ExportResponse, HEADER_COPYWRITER_CACHE_HIT, HEADER_COPYWRITER_CACHE_KEY, HEADER_COPYWRITER_MODE,
};
use crate::verdict::{GateKind, Verdict};

/// Per-case minimums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CopyDensityThresholds {
    pub min_chars: usize,
    pub min_blocks: usize,
    pub min_body_font_pt: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyDensityObservation {
    pub response: ExportResponse,
    pub layout: Resolved<Layout>,
}

/// One page falling short of one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityViolation {
    pub page_number: Option<u32>,
    pub template: String,
    pub reason: String,
}

/// Every threshold `density` misses, in chars/blocks/font order.
pub fn violations(density: &CopyDensity, thresholds: &CopyDensityThresholds) -> Vec<DensityViolation> {
    let mut reasons = Vec::new();
    if density.text_chars < thresholds.min_chars {
        reasons.push(format!("text_chars<{}", thresholds.min_chars));
    }
    if density.text_blocks < thresholds.min_blocks {
        reasons.push(format!("text_blocks<{}", thresholds.min_blocks));
    }
    if density.body_font_min_pt < thresholds.min_body_font_pt {
        reasons.push(format!("body_font_min_pt<{}", thresholds.min_body_font_pt));
    }

    reasons
        .into_iter()
        .map(|reason| DensityViolation {
            page_number: density.page_number,
            template: density.template.clone(),
            reason,
        })
        .collect()
}

pub fn verify(observation: &CopyDensityObservation, thresholds: &CopyDensityThresholds) -> Verdict {
    let response = &observation.response;
    let mut verdict = Verdict::builder(GateKind::CopyDensity);

    check_success(&mut verdict, "export succeeded", response);

    let densities: Vec<CopyDensity> = observation
        .layout
        .present()
        .map(|layout| layout.pages.iter().map(metrics::copy_density).collect())
        .unwrap_or_default();

    verdict.check("pages produced", !densities.is_empty(), ">= 1", densities.len());

    let failures: Vec<DensityViolation> = densities
        .iter()
        .flat_map(|density| violations(density, thresholds))
        .collect();
    verdict.check("every page meets copy thresholds", failures.is_empty(), thresholds, &failures);

    verdict
        .evidence("export", response.summary())
        .evidence("copywriter_mode", response.header(HEADER_COPYWRITER_MODE))
        .evidence("copywriter_cache_hit", response.header(HEADER_COPYWRITER_CACHE_HIT))
        .evidence("copywriter_cache_key", response.header(HEADER_COPYWRITER_CACHE_KEY))
        .evidence("densities", &densities)
        .evidence("page_error_codes", response.page_error_codes());
    verdict.finish()
}
