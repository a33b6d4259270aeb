//! Determinism: the same payload exported twice after one trigger yields the
//! same request hash and the same audit hash.

use serde::Serialize;

use super::check_success;
use crate::response::ExportResponse;
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct DeterminismObservation {
    pub first: ExportResponse,
    pub second: ExportResponse,
}

pub fn verify(observation: &DeterminismObservation) -> Verdict {
    let DeterminismObservation { first, second } = observation;
    let mut verdict = Verdict::builder(GateKind::Determinism);

    check_success(&mut verdict, "first export succeeded", first);
    check_success(&mut verdict, "second export succeeded", second);

    let (req_a, req_b) = (first.request_hash(), second.request_hash());
    verdict.check(
        "request hashes present",
        req_a.is_some() && req_b.is_some(),
        "non-empty",
        [req_a, req_b],
    );
    verdict.check("request hashes equal", req_a.is_some() && req_a == req_b, req_a, req_b);

    let (audit_a, audit_b) = (first.audit_hash(), second.audit_hash());
    verdict.check(
        "audit hashes present",
        audit_a.is_some() && audit_b.is_some(),
        "non-empty",
        [audit_a, audit_b],
    );
    verdict.check("audit hashes equal", audit_a.is_some() && audit_a == audit_b, audit_a, audit_b);

    verdict
        .evidence("first", first.summary())
        .evidence("second", second.summary());
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::fixtures::{ok, rejected};
    use serde_json::json;

    #[test]
    fn test_identical_hashes_pass() {
        let verdict = verify(&DeterminismObservation {
            first: ok("req-1", "aud-1"),
            second: ok("req-1", "aud-1"),
        });
        assert!(verdict.passed);
        assert_eq!(verdict.checks.len(), 6);
    }

    #[test]
    fn test_audit_drift_fails() {
        let verdict = verify(&DeterminismObservation {
            first: ok("req-1", "aud-1"),
            second: ok("req-1", "aud-2"),
        });
        assert!(!verdict.passed);
        let failed: Vec<&str> = verdict.failed_checks().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["audit hashes equal"]);
    }

    #[test]
    fn test_missing_hashes_never_compare_equal() {
        let verdict = verify(&DeterminismObservation {
            first: ok("", ""),
            second: ok("", ""),
        });
        assert!(!verdict.passed);
        assert!(!verdict.check("request hashes equal").unwrap().passed);
    }

    #[test]
    fn test_rejected_export_fails_even_with_matching_body_hashes() {
        let body = json!({"requestHash": "req-1", "exportAuditHash": "aud-1"});
        let verdict = verify(&DeterminismObservation {
            first: rejected(400, body.clone()),
            second: rejected(400, body),
        });
        assert!(!verdict.passed);
        assert!(verdict.check("request hashes equal").unwrap().passed);
        assert!(!verdict.check("first export succeeded").unwrap().passed);
    }
}
