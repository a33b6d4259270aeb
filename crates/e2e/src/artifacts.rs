//! Artifact resolution
//!
//! Reads what the service persisted for a request hash. Missing files and
//! unparsable files (possibly still being written) both resolve to
//! `Resolved::Absent`; deciding whether that is a failure is the verifier's
//! job. The resolver never writes.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use docfactory_qa_common::artifact::{
    Absence, ArtifactDigests, ExportAudit, JobArtifactSet, Layout, ReferenceIndex, Resolved,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::QaConfig;

pub const LAYOUT_FILE: &str = "layout.json";
pub const AUDIT_FILE: &str = "export-audit.json";

/// Resolves persisted job artifacts and the reference index.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    job_root: PathBuf,
    reference_index: PathBuf,
}

/// A request hash is used as a single directory name.
fn is_valid_hash(hash: &str) -> bool {
    !hash.is_empty()
        && hash != "."
        && hash != ".."
        && !hash.contains(['/', '\\', '\0'])
}

fn read_document<T>(path: &Path, parse: fn(&[u8]) -> serde_json::Result<T>) -> Resolved<T> {
    let path_display = path.display().to_string();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path_display, "Artifact missing");
            return Resolved::Absent(Absence::Missing { path: path_display });
        }
        Err(e) => {
            debug!(path = %path_display, error = %e, "Artifact unreadable");
            return Resolved::Absent(Absence::Malformed {
                path: path_display,
                detail: e.to_string(),
            });
        }
    };

    match parse(&bytes) {
        Ok(document) => Resolved::Present(document),
        Err(e) => {
            debug!(path = %path_display, error = %e, "Artifact unparsable");
            Resolved::Absent(Absence::Malformed {
                path: path_display,
                detail: e.to_string(),
            })
        }
    }
}

fn sha256_file(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    Some(hex::encode(Sha256::digest(&bytes)))
}

impl ArtifactResolver {
    pub fn new(job_root: impl Into<PathBuf>, reference_index: impl Into<PathBuf>) -> Self {
        Self {
            job_root: job_root.into(),
            reference_index: reference_index.into(),
        }
    }

    pub fn from_config(config: &QaConfig) -> Self {
        Self::new(config.job_root(), config.reference_index_path())
    }

    pub fn job_root(&self) -> &Path {
        &self.job_root
    }

    /// Directory for `hash`, or `None` if the hash is not a plain directory name.
    pub fn job_dir(&self, hash: &str) -> Option<PathBuf> {
        is_valid_hash(hash).then(|| self.job_root.join(hash))
    }

    fn job_file(&self, hash: &str, file: &str) -> Result<PathBuf, Absence> {
        self.job_dir(hash)
            .map(|dir| dir.join(file))
            .ok_or_else(|| Absence::Missing {
                path: format!("{}/<invalid hash {:?}>", self.job_root.display(), hash),
            })
    }

    pub fn layout(&self, hash: &str) -> Resolved<Layout> {
        match self.job_file(hash, LAYOUT_FILE) {
            Ok(path) => read_document(&path, Layout::parse),
            Err(absence) => Resolved::Absent(absence),
        }
    }

    pub fn audit(&self, hash: &str) -> Resolved<ExportAudit> {
        match self.job_file(hash, AUDIT_FILE) {
            Ok(path) => read_document(&path, ExportAudit::parse),
            Err(absence) => Resolved::Absent(absence),
        }
    }

    /// Both documents for `hash`. Absent iff the layout is absent.
    pub fn resolve(&self, hash: &str) -> Resolved<JobArtifactSet> {
        match self.layout(hash) {
            Resolved::Present(layout) => Resolved::Present(JobArtifactSet {
                request_hash: hash.to_string(),
                layout,
                audit: self.audit(hash),
            }),
            Resolved::Absent(absence) => Resolved::Absent(absence),
        }
    }

    /// SHA-256 of each persisted file, `None` where a file is missing.
    pub fn digests(&self, hash: &str) -> ArtifactDigests {
        match self.job_dir(hash) {
            Some(dir) => ArtifactDigests {
                layout: sha256_file(&dir.join(LAYOUT_FILE)),
                audit: sha256_file(&dir.join(AUDIT_FILE)),
            },
            None => ArtifactDigests::default(),
        }
    }

    /// Job directory whose layout was written most recently.
    pub fn latest_job(&self) -> Option<(String, SystemTime)> {
        let entries = std::fs::read_dir(&self.job_root).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let hash = entry.file_name().to_str()?.to_string();
                let modified = entry.path().join(LAYOUT_FILE).metadata().ok()?.modified().ok()?;
                Some((hash, modified))
            })
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
    }

    pub fn reference_index(&self) -> Resolved<ReferenceIndex> {
        read_document(&self.reference_index, ReferenceIndex::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn write_job(root: &Path, hash: &str, layout: &str, audit: Option<&str>) {
        let dir = root.join(hash);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LAYOUT_FILE), layout).unwrap();
        if let Some(audit) = audit {
            fs::write(dir.join(AUDIT_FILE), audit).unwrap();
        }
    }

    #[test]
    fn test_resolve_present_job() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(
            tmp.path(),
            "abc",
            r#"{"params":{"requestHash":"abc"},"pages":[{"pageNumber":1}]}"#,
            Some(r#"{"issues":[]}"#),
        );
        let resolver = ArtifactResolver::new(tmp.path(), tmp.path().join("index.json"));

        let set = resolver.resolve("abc").into_present().unwrap();
        assert_eq!(set.layout.embedded_request_hash(), Some("abc"));
        assert!(set.audit.is_present());
    }

    #[test]
    fn test_missing_and_partial_files_are_absent() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(tmp.path(), "partial", r#"{"pages": [{"pageNu"#, None);
        let resolver = ArtifactResolver::new(tmp.path(), tmp.path().join("index.json"));

        assert!(matches!(
            resolver.resolve("nope"),
            Resolved::Absent(Absence::Missing { .. })
        ));
        assert!(matches!(
            resolver.resolve("partial"),
            Resolved::Absent(Absence::Malformed { .. })
        ));
        assert!(matches!(
            resolver.reference_index(),
            Resolved::Absent(Absence::Missing { .. })
        ));
    }

    #[test]
    fn test_layout_present_audit_absent() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(tmp.path(), "h1", r#"{"pages":[]}"#, None);
        let resolver = ArtifactResolver::new(tmp.path(), tmp.path().join("index.json"));
        let set = resolver.resolve("h1").into_present().unwrap();
        assert!(!set.audit.is_present());
    }

    #[test]
    fn test_traversal_hash_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = ArtifactResolver::new(tmp.path().join("jobs"), tmp.path().join("index.json"));
        assert!(resolver.job_dir("../etc").is_none());
        assert!(resolver.job_dir("..").is_none());
        assert!(!resolver.resolve("../../secrets").is_present());
        assert_eq!(resolver.digests("a/b"), ArtifactDigests::default());
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(tmp.path(), "h2", r#"{"pages":[{"elements":[]}]}"#, Some("{}"));
        let resolver = ArtifactResolver::new(tmp.path(), tmp.path().join("index.json"));
        assert_eq!(resolver.resolve("h2"), resolver.resolve("h2"));
        let first = resolver.digests("h2");
        assert!(first.complete());
        assert_eq!(first, resolver.digests("h2"));
    }

    #[test]
    fn test_digests_change_with_content() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(tmp.path(), "h3", r#"{"pages":[]}"#, Some("{}"));
        let resolver = ArtifactResolver::new(tmp.path(), tmp.path().join("index.json"));
        let before = resolver.digests("h3");
        fs::write(tmp.path().join("h3").join(LAYOUT_FILE), r#"{"pages":[{}]}"#).unwrap();
        let after = resolver.digests("h3");
        assert_ne!(before.layout, after.layout);
        assert_eq!(before.audit, after.audit);
    }

    #[test]
    fn test_latest_job_by_layout_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(tmp.path(), "older", "{}", None);
        write_job(tmp.path(), "newer", "{}", None);
        fs::create_dir_all(tmp.path().join("no-layout")).unwrap();

        let now = SystemTime::now();
        fs::File::options()
            .write(true)
            .open(tmp.path().join("older").join(LAYOUT_FILE))
            .unwrap()
            .set_modified(now - Duration::from_secs(60))
            .unwrap();
        fs::File::options()
            .write(true)
            .open(tmp.path().join("newer").join(LAYOUT_FILE))
            .unwrap()
            .set_modified(now)
            .unwrap();

        let resolver = ArtifactResolver::new(tmp.path(), tmp.path().join("index.json"));
        assert_eq!(resolver.latest_job().unwrap().0, "newer");
    }

    #[test]
    fn test_reference_index_count() {
        let tmp = tempfile::tempdir().unwrap();
        let index = tmp.path().join("reference-index.json");
        fs::write(&index, r#"{"referenceCount": 8}"#).unwrap();
        let resolver = ArtifactResolver::new(tmp.path(), &index);
        assert_eq!(resolver.reference_index().into_present().unwrap().reference_count, Some(8));
    }
}
