//! Error types for the QA runner

use thiserror::Error;

/// Faults that abort a case or the whole run.
///
/// A service answering with an error status is not one of these: that is an
/// `ExportOutcome::Rejected` and goes to the verifier as evidence.
#[derive(Error, Debug)]
pub enum QaError {
    #[error("Transport error during {operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timeout during {operation} after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Regeneration trigger returned status {status} for {url}")]
    TriggerStatus { status: u16, url: String },

    #[error("Playwright not found. Install with: npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rule error: {0}")]
    Rule(#[from] docfactory_qa_common::Error),
}

impl QaError {
    /// Connection and timeout failures against the service or browser.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            QaError::Transport { .. } | QaError::Timeout { .. } | QaError::TriggerStatus { .. } | QaError::Http(_)
        )
    }

    /// Problems with the harness's own inputs, reported before any case runs.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            QaError::Config(_) | QaError::CaseNotFound(_) | QaError::Yaml(_) | QaError::Toml(_) | QaError::Rule(_)
        )
    }
}

pub type QaResult<T> = Result<T, QaError>;
