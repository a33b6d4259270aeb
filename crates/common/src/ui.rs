//! Control-page observations
//!
//! What the browser inspector reads from the service's control page, and
//! the parser for the `[quality]` scan lines it prints into its log panel.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tag carried by the readiness log line.
pub const RUNTIME_TAG: &str = "[runtime]";
/// Message carried by the readiness log line.
pub const RUNTIME_READY_MESSAGE: &str = "playwright runtime validator ready";
/// Prefix of quality scan lines.
pub const QUALITY_TAG: &str = "[quality]";

static QUALITY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[quality\]\s+v(\d+)\s+failedPages=(\d+)\s*\(([^)]*)\)")
        .expect("quality line pattern compiles")
});

/// One inspected control page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageObservation {
    #[serde(default)]
    pub url: String,
    /// `None` when the export control could not be found.
    #[serde(default)]
    pub export_disabled: Option<bool>,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub log_lines: Vec<String>,
    /// Set by the page-ready poll; re-derived from `log_lines` as well.
    #[serde(default)]
    pub ready_marker_seen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl PageObservation {
    /// Export control found and enabled.
    pub fn export_enabled(&self) -> bool {
        self.export_disabled == Some(false)
    }

    /// Export control found and disabled.
    pub fn export_blocked(&self) -> bool {
        self.export_disabled == Some(true)
    }

    pub fn runtime_ready(&self) -> bool {
        self.ready_marker_seen || self.log_lines.iter().any(|line| is_runtime_ready_line(line))
    }

    /// The most recent quality scan in the log, if any.
    pub fn latest_quality(&self) -> Option<QualityScan> {
        self.log_lines.iter().rev().find_map(|line| QualityScan::parse(line))
    }
}

pub fn is_runtime_ready_line(line: &str) -> bool {
    line.contains(RUNTIME_TAG) && line.contains(RUNTIME_READY_MESSAGE)
}

/// Parsed `[quality] v<version> failedPages=<count> (<pages>)` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScan {
    pub version: u64,
    pub failed_pages: u64,
    pub pages: Vec<u32>,
}

impl QualityScan {
    /// Parse one log line; non-numeric page entries are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = QUALITY_LINE.captures(line)?;
        let version = caps.get(1)?.as_str().parse().ok()?;
        let failed_pages = caps.get(2)?.as_str().parse().ok()?;
        let pages = caps
            .get(3)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .filter_map(|part| part.trim().parse::<u32>().ok())
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            version,
            failed_pages,
            pages,
        })
    }

    pub fn clean(&self) -> bool {
        self.failed_pages == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quality_line() {
        let scan = QualityScan::parse("12:00 [quality] v3 failedPages=2 (1, 4)").unwrap();
        assert_eq!(scan.version, 3);
        assert_eq!(scan.failed_pages, 2);
        assert_eq!(scan.pages, vec![1, 4]);
        assert!(!scan.clean());
    }

    #[test]
    fn test_parse_quality_line_without_pages() {
        let scan = QualityScan::parse("[quality] v1 failedPages=0 ()").unwrap();
        assert!(scan.clean());
        assert!(scan.pages.is_empty());
        assert!(QualityScan::parse("[quality] pending").is_none());
    }

    #[test]
    fn test_runtime_ready_from_lines() {
        let observation = PageObservation {
            log_lines: vec![
                "[runtime] booting".to_string(),
                "[runtime] playwright runtime validator ready".to_string(),
                "[quality] v1 failedPages=1 (2)".to_string(),
                "[quality] v2 failedPages=0 ()".to_string(),
            ],
            export_disabled: Some(false),
            ..Default::default()
        };
        assert!(observation.runtime_ready());
        assert!(observation.export_enabled());
        assert_eq!(observation.latest_quality().unwrap().version, 2);
    }

    #[test]
    fn test_observation_from_inspector_json() {
        let observation: PageObservation = serde_json::from_str(
            r#"{"url":"http://127.0.0.1:3000/?v=1","exportDisabled":true,"statusText":"size blocked","logLines":[]}"#,
        )
        .unwrap();
        assert!(observation.export_blocked());
        assert!(!observation.runtime_ready());
    }

    #[test]
    fn test_missing_control_is_neither_enabled_nor_blocked() {
        let observation = PageObservation::default();
        assert!(!observation.export_enabled());
        assert!(!observation.export_blocked());
    }
}
