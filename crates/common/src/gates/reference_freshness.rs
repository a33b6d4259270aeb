//! Reference freshness: forward-dating one reference asset blocks export
//! until a trigger rebuilds the index.

use serde::Serialize;

use super::{check_client_error, check_success, GateMarkers};
use crate::artifact::{ReferenceIndex, Resolved};
use crate::response::ExportResponse;
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct FreshnessObservation {
    /// Path of the asset whose mtime was moved forward, if one existed.
    pub touched: Option<String>,
    pub index_before: Resolved<ReferenceIndex>,
    pub stale: ExportResponse,
    pub rebuilt: ExportResponse,
    pub index_after: Resolved<ReferenceIndex>,
}

fn reference_count(index: &Resolved<ReferenceIndex>) -> Option<u64> {
    index.present().and_then(|index| index.reference_count)
}

pub fn verify(observation: &FreshnessObservation, markers: &GateMarkers) -> Verdict {
    let mut verdict = Verdict::builder(GateKind::ReferenceFreshness);

    verdict.check(
        "reference asset touched",
        observation.touched.is_some(),
        "one reference asset",
        &observation.touched,
    );

    check_client_error(&mut verdict, "stale export rejected", &observation.stale);
    verdict.check(
        "stale index reported",
        observation.stale.has_issue_containing(&markers.stale_reference_index),
        &markers.stale_reference_index,
        observation.stale.issue_messages(),
    );

    check_success(&mut verdict, "rebuilt export accepted", &observation.rebuilt);

    let stale_usage = observation
        .stale
        .body
        .as_ref()
        .and_then(|body| body.reference_usage_report.as_ref());

    verdict
        .evidence("reference_index_exists", observation.index_before.is_present())
        .evidence("reference_count", reference_count(&observation.index_before))
        .evidence("rebuild_reference_count", reference_count(&observation.index_after))
        .evidence("stale", observation.stale.summary())
        .evidence("stale_reference_usage", stale_usage)
        .evidence("rebuilt", observation.rebuilt.summary());
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Absence;
    use crate::response::fixtures::{ok, rejected};
    use serde_json::json;

    fn index(count: u64) -> Resolved<ReferenceIndex> {
        let bytes = serde_json::to_vec(&json!({"referenceCount": count})).unwrap();
        Resolved::Present(ReferenceIndex::parse(&bytes).unwrap())
    }

    fn stale() -> ExportResponse {
        rejected(
            400,
            json!({
                "exportAuditIssues": [{"code": "reference-index", "message": "reference index must be fresh"}],
                "referenceUsageReport": {"referenceIndexStatus": "stale"}
            }),
        )
    }

    #[test]
    fn test_stale_then_rebuilt_passes() {
        let verdict = verify(
            &FreshnessObservation {
                touched: Some("references/a.png".into()),
                index_before: index(8),
                stale: stale(),
                rebuilt: ok("req", "aud"),
                index_after: index(8),
            },
            &GateMarkers::default(),
        );
        assert!(verdict.passed);
        assert_eq!(verdict.evidence["reference_count"], 8);
        assert_eq!(verdict.evidence["stale"]["reference_index_status"], "stale");
    }

    #[test]
    fn test_unblocked_stale_export_fails() {
        let verdict = verify(
            &FreshnessObservation {
                touched: Some("references/a.png".into()),
                index_before: index(8),
                stale: ok("req", "aud"),
                rebuilt: ok("req", "aud"),
                index_after: index(8),
            },
            &GateMarkers::default(),
        );
        assert!(!verdict.passed);
        assert!(!verdict.check("stale index reported").unwrap().passed);
    }

    #[test]
    fn test_no_reference_asset_fails() {
        let verdict = verify(
            &FreshnessObservation {
                touched: None,
                index_before: Resolved::Absent(Absence::Missing { path: "idx".into() }),
                stale: stale(),
                rebuilt: ok("req", "aud"),
                index_after: index(0),
            },
            &GateMarkers::default(),
        );
        assert!(!verdict.passed);
        assert_eq!(verdict.evidence["reference_index_exists"], false);
    }

    #[test]
    fn test_rebuild_still_blocked_fails() {
        let verdict = verify(
            &FreshnessObservation {
                touched: Some("references/a.png".into()),
                index_before: index(3),
                stale: stale(),
                rebuilt: stale(),
                index_after: index(3),
            },
            &GateMarkers::default(),
        );
        assert!(!verdict.check("rebuilt export accepted").unwrap().passed);
    }
}
