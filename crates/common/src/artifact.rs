//! Persisted job artifacts
//!
//! Typed, leniently decoded views of the documents the service writes per
//! request hash (`layout.json`, `export-audit.json`) and of its reference
//! index. Readers hand raw bytes to [`Layout::parse`] and friends; anything
//! that is not syntactically a JSON object is reported as `Absent` by the
//! resolver, never as an error.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient;

/// Decode a document whose root must be a JSON object.
fn parse_object<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let value: Value = serde_json::from_slice(bytes)?;
    if !value.is_object() {
        return Err(<serde_json::Error as serde::de::Error>::custom(
            "expected a JSON object at the document root",
        ));
    }
    serde_json::from_value(value)
}

/// One issue reported by the service (export audit, page validation or error body).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,
}

/// Layout artifact: ordered pages plus the parameters the service generated it from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub pages: Vec<Page>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub params: LayoutParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutParams {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub request_hash: Option<String>,
}

/// A single page of a layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub page_number: Option<u32>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub page_role: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub template_id: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width_mm: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height_mm: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub meta: PageMeta,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub validation: PageValidation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageValidation {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub issues: Vec<AuditIssue>,
}

impl Page {
    /// Whether the service attached a validation issue with this code to the page.
    pub fn has_issue_code(&self, code: &str) -> bool {
        self.meta
            .validation
            .issues
            .iter()
            .any(|issue| issue.code.as_deref() == Some(code))
    }
}

/// Element type as written by the layout planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    Line,
    Image,
    Other,
}

/// A positioned element on a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub font_size_pt: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub w_mm: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub h_mm: f64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub collision_group: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub debug_only: bool,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self.kind_name.as_str() {
            "text" => ElementKind::Text,
            "line" => ElementKind::Line,
            "image" => ElementKind::Image,
            _ => ElementKind::Other,
        }
    }

    /// Text element that is rendered in the export (not debug-only).
    pub fn is_rendered_text(&self) -> bool {
        self.kind() == ElementKind::Text && !self.debug_only
    }
}

/// A rendered text element located in a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextItem {
    pub page: Option<u32>,
    pub id: String,
    pub text: String,
}

impl Layout {
    /// Parse a layout document. Fails only when the bytes are not a JSON object.
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        parse_object(bytes)
    }

    /// Every rendered (non-debug) text element across all pages, in order.
    pub fn text_items(&self) -> Vec<TextItem> {
        self.pages
            .iter()
            .flat_map(|page| {
                page.elements
                    .iter()
                    .filter(|element| element.is_rendered_text())
                    .map(move |element| TextItem {
                        page: page.page_number,
                        id: element.id.clone(),
                        text: element.text.clone(),
                    })
            })
            .collect()
    }

    /// The request hash the service embedded in the layout, if any.
    pub fn embedded_request_hash(&self) -> Option<&str> {
        self.params.request_hash.as_deref()
    }
}

/// Export audit artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAudit {
    #[serde(default, alias = "exportAuditIssues", deserialize_with = "lenient::seq")]
    pub issues: Vec<AuditIssue>,
    #[serde(default, alias = "referenceUsageReport", skip_serializing_if = "Option::is_none")]
    pub reference_usage: Option<Value>,
}

impl ExportAudit {
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        parse_object(bytes)
    }
}

/// Service-maintained reference index (`reference-index.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceIndex {
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub reference_count: Option<u64>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl ReferenceIndex {
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        parse_object(bytes)
    }
}

/// Why an artifact could not be used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Absence {
    /// Directory or file does not exist (or the key is not a valid hash).
    Missing { path: String },
    /// File exists but could not be read or parsed; may be mid-write.
    Malformed { path: String, detail: String },
}

/// Result of resolving an artifact: either parsed content or an absence sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Resolved<T> {
    Present(T),
    Absent(Absence),
}

impl<T> Resolved<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Resolved::Present(_))
    }

    pub fn present(&self) -> Option<&T> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::Absent(_) => None,
        }
    }

    pub fn into_present(self) -> Option<T> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::Absent(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        match self {
            Resolved::Present(value) => Resolved::Present(f(value)),
            Resolved::Absent(absence) => Resolved::Absent(absence),
        }
    }
}

/// Both documents persisted for one request hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobArtifactSet {
    pub request_hash: String,
    pub layout: Layout,
    pub audit: Resolved<ExportAudit>,
}

/// SHA-256 digests of the persisted files for one request hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigests {
    pub layout: Option<String>,
    pub audit: Option<String>,
}

impl ArtifactDigests {
    pub fn complete(&self) -> bool {
        self.layout.is_some() && self.audit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout_bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_parse_full_layout() {
        let bytes = layout_bytes(json!({
            "params": {"requestHash": "abc123"},
            "pages": [{
                "pageNumber": 1,
                "pageRole": "cover",
                "templateId": "HERO",
                "widthMm": 210,
                "heightMm": 297,
                "meta": {"validation": {"issues": [{"code": "content-density", "message": "thin"}]}},
                "elements": [
                    {"type": "text", "id": "title-1", "text": "Hello", "fontSizePt": 32},
                    {"type": "line", "id": "rule", "wMm": 100, "hMm": 0.5},
                    {"type": "text", "id": "debug-note", "text": "dbg", "debugOnly": true}
                ]
            }]
        }));
        let layout = Layout::parse(&bytes).unwrap();
        assert_eq!(layout.embedded_request_hash(), Some("abc123"));
        assert_eq!(layout.pages.len(), 1);
        let page = &layout.pages[0];
        assert_eq!(page.page_number, Some(1));
        assert!(page.has_issue_code("content-density"));
        assert_eq!(page.elements[0].kind(), ElementKind::Text);
        assert_eq!(page.elements[1].kind(), ElementKind::Line);
        assert_eq!(layout.text_items().len(), 1);
    }

    #[test]
    fn test_parse_tolerates_junk_members() {
        let bytes = layout_bytes(json!({
            "params": "not-an-object",
            "pages": [7, {"elements": ["x", {"type": "text", "text": "ok"}]}, null]
        }));
        let layout = Layout::parse(&bytes).unwrap();
        assert_eq!(layout.embedded_request_hash(), None);
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.pages[0].elements.len(), 1);
        assert_eq!(layout.pages[0].width_mm, 0.0);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(Layout::parse(b"[1,2]").is_err());
        assert!(Layout::parse(b"\"text\"").is_err());
        assert!(Layout::parse(b"{\"pages\": [").is_err());
    }

    #[test]
    fn test_export_audit_aliases() {
        let audit = ExportAudit::parse(
            br#"{"exportAuditIssues":[{"message":"m"}],"referenceUsageReport":{"referenceIndexStatus":"fresh"},"hash":"h"}"#,
        )
        .unwrap();
        assert_eq!(audit.issues.len(), 1);
        assert_eq!(
            audit.reference_usage,
            Some(json!({"referenceIndexStatus": "fresh"}))
        );
    }

    #[test]
    fn test_reference_index_count() {
        let index = ReferenceIndex::parse(br#"{"referenceCount": 12, "builtAt": "now"}"#).unwrap();
        assert_eq!(index.reference_count, Some(12));
    }
}
