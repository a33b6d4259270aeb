//! UI runtime gate: the control page enables export and reports a ready
//! runtime for a normal size, and disables export for an out-of-policy one.

use serde::Serialize;

use crate::ui::PageObservation;
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct UiRuntimeObservation {
    pub normal: PageObservation,
    pub blocked: PageObservation,
}

pub fn verify(observation: &UiRuntimeObservation) -> Verdict {
    let UiRuntimeObservation { normal, blocked } = observation;
    let mut verdict = Verdict::builder(GateKind::UiRuntime);

    verdict.check(
        "export enabled for normal size",
        normal.export_enabled(),
        "enabled",
        normal.export_disabled.map(|disabled| if disabled { "disabled" } else { "enabled" }),
    );
    verdict.check(
        "runtime ready marker seen",
        normal.runtime_ready(),
        true,
        normal.runtime_ready(),
    );
    verdict.check(
        "export disabled for tiny custom size",
        blocked.export_blocked(),
        "disabled",
        blocked.export_disabled.map(|disabled| if disabled { "disabled" } else { "enabled" }),
    );

    verdict
        .evidence("normal_url", &normal.url)
        .evidence("normal_status_text", &normal.status_text)
        .evidence("normal_quality", normal.latest_quality())
        .evidence("blocked_url", &blocked.url)
        .evidence("blocked_status_text", &blocked.status_text);
    for (key, path) in [("normal_screenshot", &normal.screenshot_path), ("blocked_screenshot", &blocked.screenshot_path)] {
        if path.is_some() {
            verdict.evidence(key, path);
        }
    }
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(disabled: Option<bool>, lines: &[&str]) -> PageObservation {
        PageObservation {
            url: "http://127.0.0.1:3000/?v=1".to_string(),
            export_disabled: disabled,
            log_lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_gate_behaves_passes() {
        let verdict = verify(&UiRuntimeObservation {
            normal: page(Some(false), &["[runtime] playwright runtime validator ready"]),
            blocked: page(Some(true), &[]),
        });
        assert!(verdict.passed);
    }

    #[test]
    fn test_missing_marker_fails() {
        let verdict = verify(&UiRuntimeObservation {
            normal: page(Some(false), &["[runtime] starting"]),
            blocked: page(Some(true), &[]),
        });
        assert!(!verdict.passed);
        assert!(!verdict.check("runtime ready marker seen").unwrap().passed);
    }

    #[test]
    fn test_missing_control_fails_both_ways() {
        let verdict = verify(&UiRuntimeObservation {
            normal: page(None, &["[runtime] playwright runtime validator ready"]),
            blocked: page(None, &[]),
        });
        assert_eq!(verdict.failed_checks().count(), 2);
    }
}
