//! Request shapes sent to the service
//!
//! Both the regeneration trigger and the export endpoint take flat
//! key/value parameters. The lists keep insertion order so that logged and
//! reported requests read the same way every run.

use serde::{Deserialize, Serialize};

/// Form flag that forces the service to skip reference usage (negative testing).
pub const FLAG_DISABLE_REFERENCE_USAGE: &str = "qaDisableReferenceUsage";

/// Page-size preset plus physical dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub preset: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    pub const CUSTOM_PRESET: &'static str = "CUSTOM";

    pub fn a4_portrait() -> Self {
        Self {
            preset: "A4P".to_string(),
            width_mm: 210.0,
            height_mm: 297.0,
        }
    }

    pub fn custom(width_mm: f64, height_mm: f64) -> Self {
        Self {
            preset: Self::CUSTOM_PRESET.to_string(),
            width_mm,
            height_mm,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.preset.eq_ignore_ascii_case(Self::CUSTOM_PRESET)
    }

    pub fn width_param(&self) -> String {
        format_mm(self.width_mm)
    }

    pub fn height_param(&self) -> String {
        format_mm(self.height_mm)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4_portrait()
    }
}

/// Millimetres without a trailing `.0` for whole values (`210`, `80.5`).
fn format_mm(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Ordered key/value parameters; setting an existing key replaces it in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
struct ParamList(Vec<(String, String)>);

impl ParamList {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    fn set_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.set(key, value);
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }
}

/// Form payload for `POST /api/export/pptx`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExportRequest {
    params: ParamList,
}

impl ExportRequest {
    /// The always-present fields: job identifier, variant, seed and page geometry.
    pub fn new(job_id: &str, variant: u32, seed: &str, page_size: &PageSize) -> Self {
        let mut params = ParamList::default();
        params.set("jobId", job_id);
        params.set("variantIndex", variant.to_string());
        params.set("seed", seed);
        params.set("pageSizePreset", page_size.preset.as_str());
        params.set("pageWidthMm", page_size.width_param());
        params.set("pageHeightMm", page_size.height_param());
        Self { params }
    }

    /// Variant and page geometry only, for payloads without a job.
    pub fn for_page(variant: u32, page_size: &PageSize) -> Self {
        Self {
            params: ParamList::default(),
        }
        .with_variant(variant)
        .with_page_size(page_size)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Add `key` only when `value` is present and non-empty.
    pub fn with_opt(mut self, key: &str, value: Option<&str>) -> Self {
        self.params.set_opt(key, value);
        self
    }

    pub fn with_variant(self, variant: u32) -> Self {
        self.with("variantIndex", variant.to_string())
    }

    pub fn with_page_size(self, page_size: &PageSize) -> Self {
        self.with("pageSizePreset", page_size.preset.as_str())
            .with("pageWidthMm", page_size.width_param())
            .with("pageHeightMm", page_size.height_param())
    }

    pub fn disable_reference_usage(self) -> Self {
        self.with(FLAG_DISABLE_REFERENCE_USAGE, "1")
    }

    pub fn without(mut self, key: &str) -> Self {
        self.params.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params.0
    }
}

/// Query for the side-effecting regeneration trigger (`GET /?...`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TriggerQuery {
    params: ParamList,
}

impl TriggerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bare control-page form used by the UI: `v`, plus `size`/`w`/`h`
    /// when the page size is custom.
    pub fn control_page(variant: u32, page_size: Option<&PageSize>) -> Self {
        let mut query = Self::new().with("v", variant.to_string());
        if let Some(size) = page_size {
            query = query.with("size", size.preset.as_str());
            if size.is_custom() {
                query = query
                    .with("w", size.width_param())
                    .with("h", size.height_param());
            }
        }
        query
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.set(key, value);
        self
    }

    pub fn with_opt(mut self, key: &str, value: Option<&str>) -> Self {
        self.params.set_opt(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params.0
    }

    pub fn is_empty(&self) -> bool {
        self.params.0.is_empty()
    }
}
