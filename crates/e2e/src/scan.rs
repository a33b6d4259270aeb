//! Static source scan for hard-coded sample copy

use std::path::{Path, PathBuf};

use docfactory_qa_common::gates::domain_copy::ScanSummary;
use docfactory_qa_common::RuleTable;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walks source roots and applies a rule table line by line.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    /// Findings are reported relative to this directory.
    base: PathBuf,
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl SourceScanner {
    pub fn new(base: impl Into<PathBuf>, roots: Vec<PathBuf>, extensions: &[String]) -> Self {
        Self {
            base: base.into(),
            roots,
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn wanted(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Scan every root; missing roots are skipped and listed.
    pub fn scan(&self, rules: &RuleTable) -> ScanSummary {
        let mut summary = ScanSummary::default();

        for root in &self.roots {
            let shown = self.display_path(root);
            if !root.exists() {
                debug!(root = %shown, "Scan root missing, skipping");
                summary.roots_missing.push(shown);
                continue;
            }
            summary.roots_scanned.push(shown);

            let mut files: Vec<PathBuf> = WalkDir::new(root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| self.wanted(path))
                .collect();
            files.sort();

            for path in files {
                let bytes = match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Cannot read source file");
                        continue;
                    }
                };
                let contents = String::from_utf8_lossy(&bytes);
                summary.files_scanned += 1;
                summary
                    .findings
                    .extend(rules.scan_lines(&self.display_path(&path), &contents));
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfactory_qa_common::rules::domain_copy;
    use std::fs;

    fn extensions() -> Vec<String> {
        ["ts", "tsx", "js", "jsx"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_reports_relative_findings() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src/presets");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("brochure.ts"), "const a = 1;\nexport const KIND = 'B2B_BROCHURE';\n").unwrap();
        fs::write(src.join("notes.md"), "B2B_BROCHURE in docs is fine\n").unwrap();
        fs::write(src.join("clean.tsx"), "export const Title = () => null;\n").unwrap();

        let scanner = SourceScanner::new(
            tmp.path(),
            vec![tmp.path().join("src"), tmp.path().join("app")],
            &extensions(),
        );
        let summary = scanner.scan(domain_copy());

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.roots_scanned, vec!["src"]);
        assert_eq!(summary.roots_missing, vec!["app"]);
        assert_eq!(summary.findings.len(), 1);
        assert_eq!(summary.findings[0].file, "src/presets/brochure.ts");
        assert_eq!(summary.findings[0].line, 2);
    }

    #[test]
    fn test_non_utf8_file_is_scanned_lossily() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice("const s = '자연 캠페인';\n".as_bytes());
        fs::write(app.join("page.JSX"), bytes).unwrap();

        let scanner = SourceScanner::new(tmp.path(), vec![app], &extensions());
        let summary = scanner.scan(domain_copy());
        assert_eq!(summary.findings.len(), 1);
        assert_eq!(summary.findings[0].line, 2);
    }
}
