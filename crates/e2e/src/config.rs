//! Runner configuration
//!
//! Loaded from a TOML file; every section has defaults matching a service
//! checked out in the working directory and listening on localhost:3000.
//! CLI flags override individual fields after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use docfactory_qa_common::{DensityPolicy, GateMarkers, RuleSource, RuleTable};
use docfactory_qa_common::rules;
use serde::{Deserialize, Serialize};

use crate::error::{QaError, QaResult};

/// Runner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Service endpoint configuration
    pub service: ServiceConfig,

    /// Filesystem layout of the service checkout
    pub paths: PathsConfig,

    /// Sample image provisioning and reference touching
    pub fixtures: FixtureConfig,

    /// Headless browser configuration
    pub browser: BrowserConfig,

    /// Service messages the gates look for
    pub markers: GateMarkers,

    /// Layout density floors
    pub density: DensityPolicy,

    /// Replacement pattern tables
    pub rules: RulesConfig,
}

/// Service endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the running service
    pub base_url: String,

    /// Export endpoint path
    pub export_path: String,

    /// Regeneration trigger timeout
    pub trigger_timeout_secs: u64,

    /// Export call timeout
    pub export_timeout_secs: u64,

    /// Bytes of the trigger response read before dropping it
    pub trigger_body_prefix_bytes: usize,

    /// Bytes of a successful export body read before dropping it
    pub success_body_prefix_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            export_path: "/api/export/pptx".to_string(),
            trigger_timeout_secs: 600,
            export_timeout_secs: 600,
            trigger_body_prefix_bytes: 2048,
            success_body_prefix_bytes: 64,
        }
    }
}

impl ServiceConfig {
    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_secs(self.trigger_timeout_secs)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }
}

/// Filesystem layout, relative to `root` unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Service checkout the harness runs against
    pub root: PathBuf,

    /// Per-request-hash job directories
    pub job_root: PathBuf,

    /// Reference index written by the service
    pub reference_index: PathBuf,

    /// Reference assets
    pub references_dir: PathBuf,

    /// Sample images the service picks up
    pub images_dir: PathBuf,

    /// Where reports and screenshots go
    pub output_dir: PathBuf,

    /// Source roots for the static copy scan
    pub scan_roots: Vec<PathBuf>,

    /// File extensions the static scan reads
    pub scan_extensions: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            job_root: PathBuf::from("src/generated/jobs"),
            reference_index: PathBuf::from("src/generated/reference-index.json"),
            references_dir: PathBuf::from("references"),
            images_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("qa-results"),
            scan_roots: vec![PathBuf::from("src"), PathBuf::from("app")],
            scan_extensions: ["ts", "tsx", "js", "jsx"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fixture provisioning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Extensions counted as images (lower-case, no dot)
    pub image_extensions: Vec<String>,

    /// References copied into an empty images directory
    pub sample_image_limit: usize,

    /// How far into the future a touched reference is dated
    pub touch_offset_secs: u64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            image_extensions: ["png", "jpg", "jpeg", "webp"].iter().map(|s| s.to_string()).collect(),
            sample_image_limit: 8,
            touch_offset_secs: 2,
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Node binary used to run generated scripts
    pub node_binary: String,

    /// Playwright browser type
    pub browser: String,

    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Navigation timeout including network idle
    pub navigation_timeout_ms: u64,

    /// Upper bound on the page-ready poll
    pub ready_timeout_ms: u64,

    /// Hard limit for the whole browser process
    pub process_timeout_secs: u64,

    pub export_button_selector: String,
    pub log_line_selector: String,
    pub status_selector: String,

    /// Capture diagnostic screenshots into `{output_dir}/screenshots`
    pub screenshots: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node_binary: "node".to_string(),
            browser: "chromium".to_string(),
            headless: true,
            viewport_width: 1440,
            viewport_height: 900,
            navigation_timeout_ms: 60_000,
            ready_timeout_ms: 15_000,
            process_timeout_secs: 120,
            export_button_selector: "button:has-text('Export PPTX')".to_string(),
            log_line_selector: ".page-card .page-brief .page-brief-line".to_string(),
            status_selector: ".status-panel".to_string(),
            screenshots: false,
        }
    }
}

/// Pattern tables; `None` keeps the built-in table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub internal_terms: Option<Vec<RuleSource>>,
    pub domain_copy: Option<Vec<RuleSource>>,
}

impl RulesConfig {
    pub fn internal_terms(&self) -> QaResult<RuleTable> {
        let sources = self.internal_terms.clone().unwrap_or_else(rules::internal_term_sources);
        Ok(RuleTable::compile("internal-terms", &sources)?)
    }

    pub fn domain_copy(&self) -> QaResult<RuleTable> {
        let sources = self.domain_copy.clone().unwrap_or_else(rules::domain_copy_sources);
        Ok(RuleTable::compile("domain-copy", &sources)?)
    }
}

impl QaConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> QaResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject configurations no case could run with
    pub fn validate(&self) -> QaResult<()> {
        let base = self.service.base_url.trim();
        if base.is_empty() {
            return Err(QaError::Config("service.base_url is empty".into()));
        }
        reqwest::Url::parse(base)
            .map_err(|e| QaError::Config(format!("service.base_url '{}': {}", base, e)))?;
        if !self.service.export_path.starts_with('/') {
            return Err(QaError::Config(format!(
                "service.export_path must start with '/': {}",
                self.service.export_path
            )));
        }
        if self.service.trigger_timeout_secs == 0 || self.service.export_timeout_secs == 0 {
            return Err(QaError::Config("service timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Resolve a configured path against `paths.root`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.root.join(path)
        }
    }

    pub fn job_root(&self) -> PathBuf {
        self.resolve(&self.paths.job_root)
    }

    pub fn reference_index_path(&self) -> PathBuf {
        self.resolve(&self.paths.reference_index)
    }

    pub fn references_dir(&self) -> PathBuf {
        self.resolve(&self.paths.references_dir)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.resolve(&self.paths.images_dir)
    }

    pub fn scan_roots(&self) -> Vec<PathBuf> {
        self.paths.scan_roots.iter().map(|root| self.resolve(root)).collect()
    }

    /// Output directory; not resolved against `root` so reports land where the runner was started
    pub fn output_dir(&self) -> &Path {
        &self.paths.output_dir
    }

    pub fn screenshot_dir(&self) -> Option<PathBuf> {
        self.browser
            .screenshots
            .then(|| self.paths.output_dir.join("screenshots"))
    }
}
