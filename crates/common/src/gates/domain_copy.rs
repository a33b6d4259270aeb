//! Domain-copy leakage: sample campaign copy must not be hard-coded in the
//! service sources.

use serde::Serialize;

use crate::rules::LineHit;
use crate::verdict::{GateKind, Verdict};

/// Result of walking the service source roots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Roots that existed and were walked.
    pub roots_scanned: Vec<String>,
    /// Roots that did not exist and were skipped.
    pub roots_missing: Vec<String>,
    pub files_scanned: usize,
    pub findings: Vec<LineHit>,
}

pub fn verify(summary: &ScanSummary) -> Verdict {
    let mut verdict = Verdict::builder(GateKind::DomainCopy);

    verdict.check("no sample copy in sources", summary.findings.is_empty(), 0, &summary.findings);

    verdict
        .evidence("finding_count", summary.findings.len())
        .evidence("files_scanned", summary.files_scanned)
        .evidence("roots_scanned", &summary.roots_scanned)
        .evidence("roots_missing", &summary.roots_missing);
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::domain_copy;

    #[test]
    fn test_clean_tree_passes() {
        let verdict = verify(&ScanSummary {
            roots_scanned: vec!["src".into()],
            roots_missing: vec!["app".into()],
            files_scanned: 12,
            findings: Vec::new(),
        });
        assert!(verdict.passed);
        assert_eq!(verdict.evidence["roots_missing"][0], "app");
    }

    #[test]
    fn test_findings_fail() {
        let findings = domain_copy().scan_lines("src/presets.ts", "export const preset = 'B2B_SERVICE';");
        let verdict = verify(&ScanSummary {
            roots_scanned: vec!["src".into()],
            files_scanned: 1,
            findings,
            ..Default::default()
        });
        assert!(!verdict.passed);
        assert_eq!(verdict.evidence["finding_count"], 1);
    }

    #[test]
    fn test_nothing_scanned_still_passes() {
        assert!(verify(&ScanSummary::default()).passed);
    }
}
