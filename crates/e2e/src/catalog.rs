//! Built-in case catalog
//!
//! The cases the harness runs when no case file is given. Job ids, seeds,
//! prompts and thresholds are fixed so that runs are comparable over time.

use std::collections::BTreeMap;

use docfactory_qa_common::gates::copy_density::CopyDensityThresholds;
use docfactory_qa_common::gates::layout_density::DEFAULT_MIN_PAGES;
use docfactory_qa_common::PageSize;

use crate::spec::{CaseSpec, Scenario, TestCase};

const DEFAULT_CONSTRAINTS: &str = "no-fabricated-numbers,bullet-centric-copy";

fn spec(name: &str, description: &str, tags: &[&str], scenario: Scenario) -> CaseSpec {
    CaseSpec {
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        scenario,
    }
}

/// Korean, concise brochure: the shape most hashing cases share.
fn brochure(job_id: &str, title: &str, seed: &str) -> TestCase {
    TestCase {
        job_id: Some(job_id.to_string()),
        doc_kind: Some("brochure".to_string()),
        page_count: Some("exact(2)".to_string()),
        title: Some(title.to_string()),
        seed: Some(seed.to_string()),
        language: Some("ko".to_string()),
        tone: Some("concise".to_string()),
        ..Default::default()
    }
}

fn hashed_brochure(job_id: &str, title: &str, seed: &str) -> TestCase {
    TestCase {
        constraints: Some(DEFAULT_CONSTRAINTS.to_string()),
        ..brochure(job_id, title, seed)
    }
}

fn completeness(job_id: &str, title: &str, prompt: &str, seed: &str) -> TestCase {
    TestCase {
        job_id: Some(job_id.to_string()),
        title: Some(title.to_string()),
        prompt: Some(prompt.to_string()),
        seed: Some(seed.to_string()),
        language: Some("ko".to_string()),
        tone: Some("concise".to_string()),
        ..Default::default()
    }
}

fn copy_density(job_id: &str, doc_kind: &str, page_count: &str, title: &str, prompt: &str, seed: &str) -> TestCase {
    TestCase {
        job_id: Some(job_id.to_string()),
        doc_kind: Some(doc_kind.to_string()),
        page_count: Some(page_count.to_string()),
        title: Some(title.to_string()),
        prompt: Some(prompt.to_string()),
        seed: Some(seed.to_string()),
        language: Some("ko".to_string()),
        tone: Some("concise".to_string()),
        copywriter_mode: Some("local".to_string()),
        ..Default::default()
    }
}

/// Job-less proposal payload used by the freshness and size cases.
fn proposal() -> TestCase {
    TestCase {
        extra: BTreeMap::from([("docType".to_string(), "proposal".to_string())]),
        ..Default::default()
    }
}

pub fn builtin() -> Vec<CaseSpec> {
    vec![
        spec(
            "determinism",
            "Identical payloads yield identical request and audit hashes",
            &["hashing"],
            Scenario::Determinism {
                case: hashed_brochure("qa-determinism-1", "QA_Determinism", "424242"),
            },
        ),
        spec(
            "variant-sensitivity",
            "A different variant index yields a different audit hash",
            &["hashing"],
            Scenario::VariantSensitivity {
                case: hashed_brochure("qa-determinism-1", "QA_Determinism", "424242"),
                alternate_variant: 2,
            },
        ),
        spec(
            "job-isolation",
            "A second job leaves the first job's artifacts untouched",
            &["hashing", "artifacts"],
            Scenario::JobIsolation {
                first: hashed_brochure("qa-job-a", "QA_Job_Isolation", "11111"),
                second: hashed_brochure("qa-job-b", "QA_Job_Isolation", "22222"),
            },
        ),
        spec(
            "empty-content",
            "An empty prompt still yields complete pages",
            &["content"],
            Scenario::ContentCompleteness {
                case: TestCase {
                    doc_kind: Some("poster".to_string()),
                    page_count: Some("exact(1)".to_string()),
                    ..completeness("qa-complete-empty", "QA_Content_Empty", "", "33001")
                },
            },
        ),
        spec(
            "poster-two-pages",
            "A two-poster prompt yields complete pages",
            &["content"],
            Scenario::ContentCompleteness {
                case: completeness("qa-complete-poster2", "QA_Content_Poster2", "포스터 2장 만들어줘", "33002"),
            },
        ),
        spec(
            "friend-intro",
            "A free-form prompt yields complete pages",
            &["content"],
            Scenario::ContentCompleteness {
                case: completeness("qa-complete-friend", "QA_Content_Friend", "친구 소개 포스터 만들어줘", "33003"),
            },
        ),
        spec(
            "poster_set_3p",
            "Three-poster set carries enough copy per page",
            &["content", "density"],
            Scenario::CopyDensity {
                case: copy_density(
                    "qa-copy-density-poster-set",
                    "poster_set",
                    "exact(3)",
                    "QA_CopyDensity_PosterSet",
                    "포스터 3장으로 핵심 메시지와 실행 항목을 자세히 정리해줘",
                    "561001",
                ),
                thresholds: CopyDensityThresholds {
                    min_chars: 220,
                    min_blocks: 4,
                    min_body_font_pt: 16.0,
                },
            },
        ),
        spec(
            "onepager_1p",
            "One-pager carries enough copy",
            &["content", "density"],
            Scenario::CopyDensity {
                case: copy_density(
                    "qa-copy-density-onepager",
                    "onepager",
                    "exact(1)",
                    "QA_CopyDensity_Onepager",
                    "원페이지 문서로 소개와 근거, 다음 단계까지 충분히 작성해줘",
                    "561002",
                ),
                thresholds: CopyDensityThresholds {
                    min_chars: 180,
                    min_blocks: 4,
                    min_body_font_pt: 12.0,
                },
            },
        ),
        spec(
            "brochure-density",
            "An eight-page brochure fills its pages",
            &["content", "density"],
            Scenario::LayoutDensity {
                case: TestCase {
                    page_count: Some("exact(8)".to_string()),
                    prompt: Some("한국어 브로슈어 소개서 생성".to_string()),
                    content_brief: Some("서비스 가치와 실행 근거 중심으로 구성".to_string()),
                    debug: true,
                    trigger_size: false,
                    ..brochure("qa-density-brochure", "QA_Density_Brochure", "92001")
                },
                min_pages: DEFAULT_MIN_PAGES,
                policy: None,
            },
        ),
        spec(
            "no-internal-terms",
            "Engineering vocabulary in the prompt never reaches rendered copy",
            &["content"],
            Scenario::InternalTerms {
                case: TestCase {
                    prompt: Some(
                        "RequestSpec variantIndex referenceDigest layout validation theme-factory webapp-testing"
                            .to_string(),
                    ),
                    ..brochure("qa-no-internal-terms", "QA_No_Internal_Terms", "147258")
                },
            },
        ),
        spec(
            "reference-gates",
            "Exports without reference-derived style and layout are rejected",
            &["provenance"],
            Scenario::ReferenceSource {
                case: brochure("qa-reference-gate", "QA_Reference_Gates", "99991"),
            },
        ),
        spec(
            "reference-index-freshness",
            "A stale reference index blocks export until regeneration",
            &["provenance"],
            Scenario::ReferenceFreshness {
                case: proposal(),
                stale_variant: 1,
                rebuild_variant: 2,
            },
        ),
        spec(
            "export-size-gate",
            "Tiny custom page sizes are refused",
            &["export"],
            Scenario::ExportSize {
                case: proposal(),
                blocked_size: PageSize::custom(80.0, 80.0),
            },
        ),
        spec(
            "ui-runtime-gate",
            "The control page enables export only for valid sizes",
            &["ui"],
            Scenario::UiRuntime {
                variant: 1,
                blocked_size: PageSize::custom(80.0, 80.0),
                expect_quality: false,
            },
        ),
        spec(
            "no-domain-copy",
            "No hard-coded sample campaign copy in the source tree",
            &["static"],
            Scenario::DomainCopy,
        ),
    ]
}
