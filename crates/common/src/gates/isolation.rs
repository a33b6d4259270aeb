//! Job isolation: two jobs get distinct request hashes, the second export
//! leaves the first job's files untouched, and each layout records its own
//! hash.

use serde::Serialize;

use crate::artifact::{ArtifactDigests, Layout, Resolved};
use crate::response::ExportResponse;
use crate::verdict::{GateKind, Verdict, VerdictBuilder};

#[derive(Debug, Clone, Serialize)]
pub struct IsolationObservation {
    pub first: ExportResponse,
    pub second: ExportResponse,
    /// First job's file digests right after its own export.
    pub first_before: ArtifactDigests,
    /// First job's file digests after the second job ran.
    pub first_after: ArtifactDigests,
    pub second_digests: ArtifactDigests,
    pub first_layout: Resolved<Layout>,
    pub second_layout: Resolved<Layout>,
}

fn check_embedded_hash(
    verdict: &mut VerdictBuilder,
    name: &str,
    own_hash: Option<&str>,
    layout: &Resolved<Layout>,
) -> bool {
    let embedded = layout.present().and_then(Layout::embedded_request_hash);
    verdict.check(name, own_hash.is_some() && embedded == own_hash, own_hash, embedded)
}

pub fn verify(observation: &IsolationObservation) -> Verdict {
    let mut verdict = Verdict::builder(GateKind::JobIsolation);

    let hash_a = observation.first.request_hash();
    let hash_b = observation.second.request_hash();

    verdict.check(
        "request hashes distinct",
        hash_a.is_some() && hash_b.is_some() && hash_a != hash_b,
        "two different non-empty hashes",
        [hash_a, hash_b],
    );

    verdict.check(
        "first job files stable",
        observation.first_before.complete() && observation.first_before == observation.first_after,
        &observation.first_before,
        &observation.first_after,
    );

    verdict.check(
        "second job files exist",
        observation.second_digests.complete(),
        "layout and audit present",
        &observation.second_digests,
    );

    check_embedded_hash(&mut verdict, "first layout records own hash", hash_a, &observation.first_layout);
    check_embedded_hash(&mut verdict, "second layout records own hash", hash_b, &observation.second_layout);

    verdict
        .evidence("first", observation.first.summary())
        .evidence("second", observation.second.summary());
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Absence;
    use crate::response::fixtures::ok;
    use serde_json::json;

    fn digests(layout: &str, audit: &str) -> ArtifactDigests {
        ArtifactDigests {
            layout: Some(layout.to_string()),
            audit: Some(audit.to_string()),
        }
    }

    fn layout_with_hash(hash: &str) -> Resolved<Layout> {
        let bytes = serde_json::to_vec(&json!({"params": {"requestHash": hash}, "pages": []})).unwrap();
        Resolved::Present(Layout::parse(&bytes).unwrap())
    }

    fn isolated() -> IsolationObservation {
        IsolationObservation {
            first: ok("hash-a", "aud-a"),
            second: ok("hash-b", "aud-b"),
            first_before: digests("l1", "a1"),
            first_after: digests("l1", "a1"),
            second_digests: digests("l2", "a2"),
            first_layout: layout_with_hash("hash-a"),
            second_layout: layout_with_hash("hash-b"),
        }
    }

    #[test]
    fn test_isolated_jobs_pass() {
        let verdict = verify(&isolated());
        assert!(verdict.passed, "{:?}", verdict.failed_checks().collect::<Vec<_>>());
    }

    #[test]
    fn test_overwritten_first_job_fails() {
        let mut observation = isolated();
        observation.first_after = digests("l1-changed", "a1");
        let verdict = verify(&observation);
        assert!(!verdict.passed);
        assert!(!verdict.check("first job files stable").unwrap().passed);
    }

    #[test]
    fn test_shared_hash_fails() {
        let mut observation = isolated();
        observation.second = ok("hash-a", "aud-b");
        assert!(!verify(&observation).check("request hashes distinct").unwrap().passed);
    }

    #[test]
    fn test_cross_job_bleed_fails() {
        let mut observation = isolated();
        observation.second_layout = layout_with_hash("hash-a");
        assert!(!verify(&observation).check("second layout records own hash").unwrap().passed);
    }

    #[test]
    fn test_missing_artifacts_fail() {
        let mut observation = isolated();
        observation.first_before = ArtifactDigests::default();
        observation.first_after = ArtifactDigests::default();
        observation.first_layout = Resolved::Absent(Absence::Missing { path: "x".into() });
        let verdict = verify(&observation);
        assert!(!verdict.check("first job files stable").unwrap().passed);
        assert!(!verdict.check("first layout records own hash").unwrap().passed);
    }
}
