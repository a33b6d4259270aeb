//! Export size policy: a normal page size exports, an out-of-policy custom
//! size is refused.

use serde::Serialize;

use super::{check_client_error, check_success};
use crate::request::PageSize;
use crate::response::ExportResponse;
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct ExportSizeObservation {
    pub normal_size: PageSize,
    pub blocked_size: PageSize,
    pub normal: ExportResponse,
    pub blocked: ExportResponse,
}

pub fn verify(observation: &ExportSizeObservation) -> Verdict {
    let mut verdict = Verdict::builder(GateKind::ExportSize);

    check_success(&mut verdict, "normal size exported", &observation.normal);
    check_client_error(&mut verdict, "out-of-policy size refused", &observation.blocked);

    verdict
        .evidence("normal_size", &observation.normal_size)
        .evidence("blocked_size", &observation.blocked_size)
        .evidence("normal_content_type", observation.normal.header("content-type"))
        .evidence("normal_content_disposition", observation.normal.header("content-disposition"))
        .evidence("blocked", observation.blocked.summary())
        .evidence("blocked_body", &observation.blocked.raw_body);
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::fixtures::{ok_with, rejected};
    use serde_json::json;

    fn observation(normal: ExportResponse, blocked: ExportResponse) -> ExportSizeObservation {
        ExportSizeObservation {
            normal_size: PageSize::a4_portrait(),
            blocked_size: PageSize::custom(80.0, 80.0),
            normal,
            blocked,
        }
    }

    #[test]
    fn test_policy_enforced_passes() {
        let normal = ok_with(&[("Content-Type", "application/vnd.openxmlformats-officedocument.presentationml.presentation")]);
        let verdict = verify(&observation(
            normal,
            rejected(400, json!({"error": "page size below minimum"})),
        ));
        assert!(verdict.passed);
        assert!(verdict.evidence["normal_content_type"]
            .as_str()
            .unwrap()
            .contains("presentationml"));
    }

    #[test]
    fn test_tiny_page_accepted_fails() {
        let verdict = verify(&observation(ok_with(&[]), ok_with(&[])));
        assert!(!verdict.passed);
        assert!(!verdict.check("out-of-policy size refused").unwrap().passed);
    }

    #[test]
    fn test_server_error_is_not_a_refusal() {
        let verdict = verify(&observation(ok_with(&[]), rejected(500, json!({}))));
        assert!(!verdict.passed);
        let check = verdict.check("out-of-policy size refused").unwrap();
        assert_eq!(check.expected, "4xx");
        assert_eq!(check.observed, 500);
    }

    #[test]
    fn test_unprocessable_entity_is_a_refusal() {
        let verdict = verify(&observation(ok_with(&[]), rejected(422, json!({"error": "too small"}))));
        assert!(verdict.passed);
    }
}
