//! Declarative YAML case specification
//!
//! A case file is a YAML list of [`CaseSpec`]s. Each spec names one gate and
//! carries the request fields and thresholds that gate's scenario needs:
//!
//! ```yaml
//! - name: determinism
//!   gate: determinism
//!   case:
//!     job_id: qa-determinism-1
//!     doc_kind: brochure
//!     page_count: exact(2)
//!     seed: 424242
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use docfactory_qa_common::gates::copy_density::CopyDensityThresholds;
use docfactory_qa_common::gates::layout_density::DEFAULT_MIN_PAGES;
use docfactory_qa_common::{lenient, DensityPolicy, ExportRequest, GateKind, PageSize, TriggerQuery};
use serde::{Deserialize, Serialize};

use crate::error::{QaError, QaResult};
use crate::fixtures::SampleImages;

/// Request parameters shared by the trigger and the export payload.
///
/// Optional fields are sent whenever they are present, including as empty
/// strings; an absent field is never sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_kind: Option<String>,

    /// Page-count directive such as `exact(2)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_brief: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub seed: Option<String>,

    #[serde(default = "default_variant")]
    pub variant: u32,

    #[serde(default)]
    pub page_size: PageSize,

    /// Send `size` (and `w`/`h`) with the regeneration trigger
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub trigger_size: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    /// Comma-separated constraint ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copywriter_mode: Option<String>,

    /// Ask the service for debug output on regeneration
    #[serde(default, skip_serializing_if = "is_false")]
    pub debug: bool,

    /// Additional export form fields, sent verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

fn default_variant() -> u32 {
    1
}

impl Default for TestCase {
    fn default() -> Self {
        Self {
            job_id: None,
            doc_kind: None,
            page_count: None,
            title: None,
            prompt: None,
            content_brief: None,
            seed: None,
            variant: default_variant(),
            page_size: PageSize::default(),
            trigger_size: true,
            language: None,
            tone: None,
            constraints: None,
            copywriter_mode: None,
            debug: false,
            extra: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

fn set(request: ExportRequest, key: &str, value: &Option<String>) -> ExportRequest {
    match value {
        Some(value) => request.with(key, value.as_str()),
        None => request,
    }
}

fn set_query(query: TriggerQuery, key: &str, value: &Option<String>) -> TriggerQuery {
    match value {
        Some(value) => query.with(key, value.as_str()),
        None => query,
    }
}

impl TestCase {
    pub fn label(&self) -> &str {
        self.job_id.as_deref().unwrap_or("<no job id>")
    }

    /// Form payload for the export endpoint.
    pub fn to_export_request(&self) -> ExportRequest {
        let mut request = ExportRequest::for_page(self.variant, &self.page_size);
        request = set(request, "jobId", &self.job_id);
        request = set(request, "seed", &self.seed);
        request = set(request, "docKind", &self.doc_kind);
        request = set(request, "pageCount", &self.page_count);
        request = set(request, "title", &self.title);
        request = set(request, "prompt", &self.prompt);
        request = set(request, "contentBrief", &self.content_brief);
        request = set(request, "language", &self.language);
        request = set(request, "tone", &self.tone);
        request = set(request, "constraints", &self.constraints);
        request = set(request, "copywriterMode", &self.copywriter_mode);
        for (key, value) in &self.extra {
            request = request.with(key, value.as_str());
        }
        request
    }

    /// Query for the regeneration trigger. Export-only fields (constraints,
    /// copywriter mode, extras) are left out.
    pub fn to_trigger_query(&self) -> TriggerQuery {
        let mut query = TriggerQuery::new();
        query = set_query(query, "jobId", &self.job_id);
        query = set_query(query, "docKind", &self.doc_kind);
        query = set_query(query, "pageCount", &self.page_count);
        query = set_query(query, "title", &self.title);
        query = set_query(query, "prompt", &self.prompt);
        query = set_query(query, "contentBrief", &self.content_brief);
        query = set_query(query, "language", &self.language);
        query = set_query(query, "tone", &self.tone);
        query = query.with("variantIndex", self.variant.to_string());
        query = set_query(query, "seed", &self.seed);
        if self.trigger_size {
            query = query.with("size", self.page_size.preset.as_str());
            if self.page_size.is_custom() {
                query = query
                    .with("w", self.page_size.width_param())
                    .with("h", self.page_size.height_param());
            }
        }
        if self.debug {
            query = query.with("debug", "1");
        }
        query
    }
}

fn default_alternate_variant() -> u32 {
    2
}

fn default_min_pages() -> usize {
    DEFAULT_MIN_PAGES
}

fn default_blocked_size() -> PageSize {
    PageSize::custom(80.0, 80.0)
}

fn default_stale_variant() -> u32 {
    1
}

fn default_rebuild_variant() -> u32 {
    2
}

/// Gate-specific scenario parameters, tagged by `gate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Scenario {
    /// Trigger once, export twice.
    Determinism { case: TestCase },

    /// Export the base variant twice and the alternate once.
    VariantSensitivity {
        case: TestCase,
        #[serde(default = "default_alternate_variant")]
        alternate_variant: u32,
    },

    /// Two jobs run back to back; the first job's files must not change.
    JobIsolation { first: TestCase, second: TestCase },

    ContentCompleteness { case: TestCase },

    CopyDensity {
        case: TestCase,
        thresholds: CopyDensityThresholds,
    },

    /// Trigger only; the layout is read from the newest job directory.
    LayoutDensity {
        case: TestCase,
        #[serde(default = "default_min_pages")]
        min_pages: usize,
        /// Replaces the configured density floors for this case
        #[serde(default, skip_serializing_if = "Option::is_none")]
        policy: Option<DensityPolicy>,
    },

    InternalTerms { case: TestCase },

    /// The case is exported once with reference usage disabled and once as is.
    ReferenceSource { case: TestCase },

    /// Touch a reference, export against the stale index, regenerate, export again.
    ReferenceFreshness {
        case: TestCase,
        #[serde(default = "default_stale_variant")]
        stale_variant: u32,
        #[serde(default = "default_rebuild_variant")]
        rebuild_variant: u32,
    },

    ExportSize {
        case: TestCase,
        #[serde(default = "default_blocked_size")]
        blocked_size: PageSize,
    },

    /// Inspect the control page at a normal and a blocked page size.
    UiRuntime {
        #[serde(default = "default_variant")]
        variant: u32,
        #[serde(default = "default_blocked_size")]
        blocked_size: PageSize,
        #[serde(default)]
        expect_quality: bool,
    },

    DomainCopy,
}

impl Scenario {
    pub fn gate(&self) -> GateKind {
        match self {
            Scenario::Determinism { .. } => GateKind::Determinism,
            Scenario::VariantSensitivity { .. } => GateKind::VariantSensitivity,
            Scenario::JobIsolation { .. } => GateKind::JobIsolation,
            Scenario::ContentCompleteness { .. } => GateKind::ContentCompleteness,
            Scenario::CopyDensity { .. } => GateKind::CopyDensity,
            Scenario::LayoutDensity { .. } => GateKind::LayoutDensity,
            Scenario::InternalTerms { .. } => GateKind::InternalTerms,
            Scenario::ReferenceSource { .. } => GateKind::ReferenceSource,
            Scenario::ReferenceFreshness { .. } => GateKind::ReferenceFreshness,
            Scenario::ExportSize { .. } => GateKind::ExportSize,
            Scenario::UiRuntime { .. } => GateKind::UiRuntime,
            Scenario::DomainCopy => GateKind::DomainCopy,
        }
    }

    /// How sample images are seeded before this scenario, if at all.
    pub fn sample_images(&self) -> Option<SampleImages> {
        match self {
            Scenario::CopyDensity { .. } => Some(SampleImages::COPY_DENSITY),
            Scenario::LayoutDensity { .. } => Some(SampleImages::LAYOUT_DENSITY),
            Scenario::JobIsolation { .. }
            | Scenario::ContentCompleteness { .. }
            | Scenario::InternalTerms { .. }
            | Scenario::ReferenceSource { .. } => Some(SampleImages::GENERAL),
            _ => None,
        }
    }
}

/// One named case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSpec {
    /// Unique name for this case
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub scenario: Scenario,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CaseDocument {
    Many(Vec<CaseSpec>),
    One(CaseSpec),
}

impl CaseSpec {
    pub fn gate(&self) -> GateKind {
        self.scenario.gate()
    }

    /// Parse a YAML document holding one spec or a list of them.
    pub fn from_yaml(yaml: &str) -> QaResult<Vec<Self>> {
        let document: CaseDocument = serde_yaml::from_str(yaml)?;
        Ok(match document {
            CaseDocument::Many(specs) => specs,
            CaseDocument::One(spec) => vec![spec],
        })
    }

    pub fn from_file(path: &Path) -> QaResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QaError::Config(format!("cannot read case file {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Load a case file, or every YAML file under a directory.
    pub fn load_all(path: &Path) -> QaResult<Vec<Self>> {
        if path.is_file() {
            return Self::from_file(path);
        }
        if !path.exists() {
            return Err(QaError::Config(format!("case path not found: {}", path.display())));
        }

        let mut files: Vec<_> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut specs = Vec::new();
        for file in files {
            specs.extend(Self::from_file(&file)?);
        }
        Ok(specs)
    }

    /// Specs for one gate, in file order.
    pub fn filter_by_gate(specs: &[Self], gate: GateKind) -> Vec<&Self> {
        specs.iter().filter(|s| s.gate() == gate).collect()
    }

    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}
