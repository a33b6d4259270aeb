//! Normalized export responses
//!
//! The export endpoint answers in two shapes: a header-bearing success
//! (binary document body) and a body-bearing error (JSON issue list). Both
//! are reconciled into one [`ExportResponse`] so verifiers never branch on
//! where a value came from, only on what it is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::AuditIssue;
use crate::lenient;

pub const HEADER_REQUEST_HASH: &str = "x-docfactory-request-hash";
pub const HEADER_AUDIT_HASH: &str = "x-docfactory-audit-hash";
pub const HEADER_CONTENT_COMPLETENESS: &str = "x-docfactory-content-completeness";
pub const HEADER_CONTENT_INTERNAL_TERMS: &str = "x-docfactory-content-internal-terms";
pub const HEADER_REFERENCE_USAGE: &str = "x-docfactory-reference-usage";
pub const HEADER_COPYWRITER_MODE: &str = "x-docfactory-copywriter-mode";
pub const HEADER_COPYWRITER_CACHE_HIT: &str = "x-docfactory-copywriter-cache-hit";
pub const HEADER_COPYWRITER_CACHE_KEY: &str = "x-docfactory-copywriter-cache-key";
pub const HEADER_REFERENCE_INDEX_STATUS: &str = "x-docfactory-reference-index-status";

/// Longest error body kept verbatim for diagnostics.
const RAW_BODY_LIMIT: usize = 4096;

/// Structured error body. Keys are matched after [`lenient::fold_keys`], so
/// `requestHash`, `request_hash` and `RequestHash` are the same field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportErrorBody {
    #[serde(
        rename(deserialize = "requesthash", serialize = "requestHash"),
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_hash: Option<String>,
    #[serde(
        rename(deserialize = "exportaudithash", serialize = "exportAuditHash"),
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub export_audit_hash: Option<String>,
    #[serde(
        rename(deserialize = "exportauditissues", serialize = "exportAuditIssues"),
        default,
        deserialize_with = "lenient::seq"
    )]
    pub export_audit_issues: Vec<AuditIssue>,
    #[serde(
        rename(deserialize = "pageerrors", serialize = "pageErrors"),
        default,
        deserialize_with = "lenient::seq"
    )]
    pub page_errors: Vec<PageError>,
    #[serde(
        rename(deserialize = "referenceusagereport", serialize = "referenceUsageReport"),
        default,
        deserialize_with = "lenient::opt_object",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_usage_report: Option<ReferenceUsageReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageError {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub issues: Vec<AuditIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceUsageReport {
    #[serde(
        rename(deserialize = "referenceindexstatus", serialize = "referenceIndexStatus"),
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_index_status: Option<String>,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl ExportErrorBody {
    /// Parse an error body; `None` unless it is a JSON object.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(bytes).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(lenient::fold_keys(value)).ok()
    }
}

/// One export call, success or failure, in a single shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResponse {
    pub status: u16,
    /// Header names lower-cased; repeated headers keep the last value.
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ExportErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

impl ExportResponse {
    /// Build a response from wire parts. Bodies are only interpreted on
    /// error statuses; success bodies are the exported document.
    pub fn from_parts<I, K, V>(status: u16, headers: I, body: Option<&[u8]>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
            .collect();

        let (body, raw_body) = match body {
            Some(bytes) if status >= 400 && !bytes.is_empty() => {
                let raw: String = String::from_utf8_lossy(bytes).chars().take(RAW_BODY_LIMIT).collect();
                (ExportErrorBody::parse(bytes), Some(raw))
            }
            _ => (None, None),
        };

        Self {
            status,
            headers,
            body,
            raw_body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_rejected(&self) -> bool {
        self.status >= 400
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.header(name).map(str::trim).filter(|v| !v.is_empty())
    }

    fn body_value<'a>(&'a self, pick: impl Fn(&'a ExportErrorBody) -> Option<&'a String>) -> Option<&'a str> {
        self.body
            .as_ref()
            .and_then(pick)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Request hash: header on success, body on error, falling back to the
    /// other source when the expected one is missing.
    pub fn request_hash(&self) -> Option<&str> {
        let header = self.header_value(HEADER_REQUEST_HASH);
        let body = self.body_value(|b| b.request_hash.as_ref());
        if self.is_success() {
            header.or(body)
        } else {
            body.or(header)
        }
    }

    /// Audit hash, reconciled the same way as [`Self::request_hash`].
    pub fn audit_hash(&self) -> Option<&str> {
        let header = self.header_value(HEADER_AUDIT_HASH);
        let body = self.body_value(|b| b.export_audit_hash.as_ref());
        if self.is_success() {
            header.or(body)
        } else {
            body.or(header)
        }
    }

    pub fn reference_index_status(&self) -> Option<&str> {
        self.header_value(HEADER_REFERENCE_INDEX_STATUS).or_else(|| {
            self.body
                .as_ref()
                .and_then(|b| b.reference_usage_report.as_ref())
                .and_then(|r| r.reference_index_status.as_deref())
        })
    }

    /// Export audit issues from the error body (empty on success).
    pub fn issues(&self) -> &[AuditIssue] {
        self.body
            .as_ref()
            .map(|b| b.export_audit_issues.as_slice())
            .unwrap_or(&[])
    }

    pub fn issue_messages(&self) -> Vec<&str> {
        self.issues()
            .iter()
            .map(|issue| issue.message.as_str())
            .filter(|m| !m.is_empty())
            .collect()
    }

    /// Whether any export audit issue message contains `marker`.
    pub fn has_issue_containing(&self, marker: &str) -> bool {
        self.issues().iter().any(|issue| issue.message.contains(marker))
    }

    /// Non-empty issue codes across all page errors.
    pub fn page_error_codes(&self) -> Vec<&str> {
        self.body
            .as_ref()
            .map(|b| {
                b.page_errors
                    .iter()
                    .flat_map(|page| page.issues.iter())
                    .filter_map(|issue| issue.code.as_deref())
                    .filter(|code| !code.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Compact view used as verdict evidence.
    pub fn summary(&self) -> ExportSummary {
        ExportSummary {
            status: self.status,
            request_hash: self.request_hash().map(str::to_string),
            audit_hash: self.audit_hash().map(str::to_string),
            reference_index_status: self.reference_index_status().map(str::to_string),
            issues: self.issue_messages().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Evidence-friendly summary of one export call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub status: u16,
    pub request_hash: Option<String>,
    pub audit_hash: Option<String>,
    pub reference_index_status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Tagged export result: both arms carry the same normalized shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "response", rename_all = "snake_case")]
pub enum ExportOutcome {
    Accepted(ExportResponse),
    Rejected(ExportResponse),
}

impl ExportOutcome {
    pub fn classify(response: ExportResponse) -> Self {
        if response.is_rejected() {
            ExportOutcome::Rejected(response)
        } else {
            ExportOutcome::Accepted(response)
        }
    }

    pub fn response(&self) -> &ExportResponse {
        match self {
            ExportOutcome::Accepted(response) | ExportOutcome::Rejected(response) => response,
        }
    }

    pub fn into_response(self) -> ExportResponse {
        match self {
            ExportOutcome::Accepted(response) | ExportOutcome::Rejected(response) => response,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ExportOutcome::Accepted(_))
    }
}
