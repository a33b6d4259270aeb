//! Internal-term leakage: pipeline vocabulary fed in as a prompt must either
//! be scrubbed from the rendered copy or rejected explicitly. Silent
//! pass-through fails.

use serde::Serialize;

use super::GateMarkers;
use crate::artifact::{Layout, Resolved};
use crate::response::ExportResponse;
use crate::rules::RuleTable;
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct InternalTermsObservation {
    pub response: ExportResponse,
    pub layout: Resolved<Layout>,
}

/// A forbidden term found in rendered copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForbiddenHit {
    pub page: Option<u32>,
    pub id: String,
    pub label: String,
    pub pattern: String,
    pub text: String,
}

pub fn forbidden_hits(layout: &Layout, rules: &RuleTable) -> Vec<ForbiddenHit> {
    layout
        .text_items()
        .into_iter()
        .flat_map(|item| {
            rules
                .matches(&item.text)
                .into_iter()
                .map(move |hit| ForbiddenHit {
                    page: item.page,
                    id: item.id.clone(),
                    label: hit.label,
                    pattern: hit.pattern,
                    text: item.text.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn verify(observation: &InternalTermsObservation, rules: &RuleTable, markers: &GateMarkers) -> Verdict {
    let response = &observation.response;
    let mut verdict = Verdict::builder(GateKind::InternalTerms);
    let blocked = response.has_issue_containing(&markers.internal_term_leakage);

    if response.is_success() {
        let hits = observation
            .layout
            .present()
            .map(|layout| forbidden_hits(layout, rules))
            .unwrap_or_default();
        verdict.check(
            "layout resolved",
            observation.layout.is_present(),
            "present",
            observation.layout.is_present(),
        );
        verdict.check("no internal terms rendered", hits.is_empty(), 0, &hits);
        verdict.check(
            "request hash present",
            response.request_hash().is_some(),
            "non-empty",
            response.request_hash(),
        );
        verdict.evidence("forbidden_hit_count", hits.len());
    } else if response.is_client_error() {
        verdict.check(
            "rejection names leakage",
            blocked,
            &markers.internal_term_leakage,
            response.issue_messages(),
        );
    } else {
        verdict.check("sanitized or rejected", false, "200 or 4xx", response.status);
    }

    verdict
        .evidence("export", response.summary())
        .evidence("blocked_by_internal_term_gate", blocked)
        .evidence("rule_table", rules.name());
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Absence;
    use crate::response::fixtures::{ok, rejected};
    use crate::rules::internal_terms;
    use serde_json::json;

    fn layout(texts: &[&str]) -> Resolved<Layout> {
        let elements: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| json!({"type": "text", "id": format!("body-{i}"), "text": text}))
            .collect();
        let bytes = serde_json::to_vec(&json!({"pages": [{"pageNumber": 1, "elements": elements}]})).unwrap();
        Resolved::Present(Layout::parse(&bytes).unwrap())
    }

    #[test]
    fn test_sanitized_copy_passes() {
        let verdict = verify(
            &InternalTermsObservation {
                response: ok("req", "aud"),
                layout: layout(&["고객 맞춤 브로슈어", "실행 계획"]),
            },
            internal_terms(),
            &GateMarkers::default(),
        );
        assert!(verdict.passed);
    }

    #[test]
    fn test_leaked_terms_fail_with_locations() {
        let verdict = verify(
            &InternalTermsObservation {
                response: ok("req", "aud"),
                layout: layout(&["clean", "see the Layout and validation notes"]),
            },
            internal_terms(),
            &GateMarkers::default(),
        );
        assert!(!verdict.passed);
        let check = verdict.check("no internal terms rendered").unwrap();
        assert_eq!(check.observed.as_array().unwrap().len(), 2);
        assert_eq!(check.observed[0]["id"], "body-1");
        assert_eq!(check.observed[0]["page"], 1);
    }

    #[test]
    fn test_explicit_rejection_passes() {
        let verdict = verify(
            &InternalTermsObservation {
                response: rejected(400, json!({"exportAuditIssues": [{"code": "copy", "message": "internal term leakage detected: layout"}]})),
                layout: Resolved::Absent(Absence::Missing { path: "x".into() }),
            },
            internal_terms(),
            &GateMarkers::default(),
        );
        assert!(verdict.passed);
    }

    #[test]
    fn test_unrelated_rejection_fails() {
        let verdict = verify(
            &InternalTermsObservation {
                response: rejected(400, json!({"exportAuditIssues": [{"message": "page size too small"}]})),
                layout: Resolved::Absent(Absence::Missing { path: "x".into() }),
            },
            internal_terms(),
            &GateMarkers::default(),
        );
        assert!(!verdict.passed);
    }

    #[test]
    fn test_server_error_fails() {
        let verdict = verify(
            &InternalTermsObservation {
                response: rejected(500, json!({"exportAuditIssues": [{"message": "internal term leakage detected"}]})),
                layout: Resolved::Absent(Absence::Missing { path: "x".into() }),
            },
            internal_terms(),
            &GateMarkers::default(),
        );
        assert!(!verdict.passed);
        assert!(verdict.check("sanitized or rejected").is_some());
    }
}
