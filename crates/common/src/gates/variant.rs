//! Variant sensitivity: repeating a variant keeps the audit hash, changing
//! the variant index changes it.

use serde::Serialize;

use super::check_success;
use crate::response::ExportResponse;
use crate::verdict::{GateKind, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct VariantObservation {
    pub base_variant: u32,
    pub alternate_variant: u32,
    pub base: ExportResponse,
    pub repeat: ExportResponse,
    pub alternate: ExportResponse,
}

pub fn verify(observation: &VariantObservation) -> Verdict {
    let mut verdict = Verdict::builder(GateKind::VariantSensitivity);

    check_success(&mut verdict, "base export succeeded", &observation.base);
    check_success(&mut verdict, "repeat export succeeded", &observation.repeat);
    check_success(&mut verdict, "alternate export succeeded", &observation.alternate);

    verdict.check(
        "variants differ",
        observation.base_variant != observation.alternate_variant,
        "distinct variant indexes",
        [observation.base_variant, observation.alternate_variant],
    );

    let base = observation.base.audit_hash();
    let repeat = observation.repeat.audit_hash();
    let alternate = observation.alternate.audit_hash();

    verdict.check("same variant keeps audit hash", base.is_some() && base == repeat, base, repeat);
    verdict.check(
        "other variant changes audit hash",
        base.is_some() && alternate.is_some() && base != alternate,
        format!("!= {}", base.unwrap_or("<missing>")),
        alternate,
    );

    verdict
        .evidence("base_variant", observation.base_variant)
        .evidence("alternate_variant", observation.alternate_variant)
        .evidence("base", observation.base.summary())
        .evidence("repeat", observation.repeat.summary())
        .evidence("alternate", observation.alternate.summary());
    verdict.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::fixtures::ok;

    fn observation(base: &str, repeat: &str, alternate: &str) -> VariantObservation {
        VariantObservation {
            base_variant: 1,
            alternate_variant: 2,
            base: ok("req-1", base),
            repeat: ok("req-1", repeat),
            alternate: ok("req-2", alternate),
        }
    }

    #[test]
    fn test_sensitive_service_passes() {
        assert!(verify(&observation("a1", "a1", "a2")).passed);
    }

    #[test]
    fn test_insensitive_service_fails() {
        let verdict = verify(&observation("a1", "a1", "a1"));
        assert!(!verdict.passed);
        assert!(!verdict.check("other variant changes audit hash").unwrap().passed);
    }

    #[test]
    fn test_unstable_repeat_fails() {
        let verdict = verify(&observation("a1", "a3", "a2"));
        assert!(!verdict.check("same variant keeps audit hash").unwrap().passed);
    }

    #[test]
    fn test_missing_alternate_hash_fails() {
        assert!(!verify(&observation("a1", "a1", "")).passed);
    }
}
