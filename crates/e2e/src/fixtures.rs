//! Fixture provisioning
//!
//! The service needs a few sample images before it will generate anything,
//! and the freshness scenario needs one reference asset dated into the
//! future. Both operate on the harness's own fixture directories only.

use std::fs::{self, FileTimes};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::QaConfig;
use crate::error::{QaError, QaResult};

/// How the images directory is seeded for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleImages {
    /// File name prefix of the copies, followed by a 1-based `{:03}` index
    pub prefix: &'static str,
    /// References to copy; `None` uses the configured limit
    pub limit: Option<usize>,
}

impl SampleImages {
    pub const GENERAL: SampleImages = SampleImages {
        prefix: "qa-",
        limit: None,
    };
    pub const COPY_DENSITY: SampleImages = SampleImages {
        prefix: "qa-copy-",
        limit: Some(10),
    };
    pub const LAYOUT_DENSITY: SampleImages = SampleImages {
        prefix: "qa-density-",
        limit: Some(10),
    };
}

/// Sample image and reference asset handling.
#[derive(Debug, Clone)]
pub struct Fixtures {
    images_dir: PathBuf,
    references_dir: PathBuf,
    extensions: Vec<String>,
    limit: usize,
    touch_offset: Duration,
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn sort_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

impl Fixtures {
    pub fn new(images_dir: impl Into<PathBuf>, references_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            references_dir: references_dir.into(),
            extensions: ["png", "jpg", "jpeg", "webp"].iter().map(|s| s.to_string()).collect(),
            limit: 8,
            touch_offset: Duration::from_secs(2),
        }
    }

    pub fn from_config(config: &QaConfig) -> Self {
        Self {
            images_dir: config.images_dir(),
            references_dir: config.references_dir(),
            extensions: config
                .fixtures
                .image_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            limit: config.fixtures.sample_image_limit,
            touch_offset: Duration::from_secs(config.fixtures.touch_offset_secs),
        }
    }

    fn is_image(&self, path: &Path) -> bool {
        path.is_file()
            && lowercase_extension(path)
                .map(|ext| self.extensions.contains(&ext))
                .unwrap_or(false)
    }

    /// Images directly inside the images directory.
    pub fn images(&self) -> QaResult<Vec<PathBuf>> {
        if !self.images_dir.exists() {
            return Ok(Vec::new());
        }
        let mut images: Vec<PathBuf> = fs::read_dir(&self.images_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| self.is_image(path))
            .collect();
        images.sort();
        Ok(images)
    }

    /// Reference images anywhere under the references directory, ordered by
    /// lower-cased path.
    pub fn references(&self) -> Vec<PathBuf> {
        let mut references: Vec<PathBuf> = WalkDir::new(&self.references_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| self.is_image(path))
            .collect();
        references.sort_by_key(|path| sort_key(path));
        references
    }

    /// Populate the images directory from references once. Returns the
    /// number of images present afterwards; an existing non-empty directory
    /// is left alone.
    pub fn ensure_sample_images(&self, plan: &SampleImages) -> QaResult<usize> {
        fs::create_dir_all(&self.images_dir).map_err(|e| {
            QaError::Fixture(format!("cannot create {}: {}", self.images_dir.display(), e))
        })?;

        let existing = self.images()?;
        if !existing.is_empty() {
            debug!(count = existing.len(), dir = %self.images_dir.display(), "Sample images already present");
            return Ok(existing.len());
        }

        let sources = self.references();
        if sources.is_empty() {
            warn!(dir = %self.references_dir.display(), "No reference images to provision samples from");
        }

        let limit = plan.limit.unwrap_or(self.limit);
        for (index, source) in sources.iter().take(limit).enumerate() {
            let ext = lowercase_extension(source).unwrap_or_default();
            let target = self.images_dir.join(format!("{}{:03}.{}", plan.prefix, index + 1, ext));
            fs::copy(source, &target).map_err(|e| {
                QaError::Fixture(format!("cannot copy {} to {}: {}", source.display(), target.display(), e))
            })?;
        }

        let count = self.images()?.len();
        info!(count, prefix = plan.prefix, dir = %self.images_dir.display(), "Provisioned sample images");
        Ok(count)
    }

    /// Move the first reference's access and modification times into the
    /// future so the service's index becomes stale. `None` if there are no
    /// references.
    pub fn touch_first_reference(&self) -> QaResult<Option<PathBuf>> {
        let Some(target) = self.references().into_iter().next() else {
            warn!(dir = %self.references_dir.display(), "No reference asset to touch");
            return Ok(None);
        };

        let future = SystemTime::now() + self.touch_offset;
        let file = fs::File::options()
            .write(true)
            .open(&target)
            .map_err(|e| QaError::Fixture(format!("cannot open {}: {}", target.display(), e)))?;
        file.set_times(FileTimes::new().set_accessed(future).set_modified(future))
            .map_err(|e| QaError::Fixture(format!("cannot touch {}: {}", target.display(), e)))?;

        info!(path = %target.display(), "Forward-dated reference asset");
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Fixtures) {
        let tmp = tempfile::tempdir().unwrap();
        let fixtures = Fixtures::new(tmp.path().join("images"), tmp.path().join("references"));
        (tmp, fixtures)
    }

    fn write(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_provisions_from_sorted_references() {
        let (tmp, fixtures) = setup();
        let refs = tmp.path().join("references");
        write(&refs.join("b/Second.PNG"), b"second");
        write(&refs.join("a/first.jpg"), b"first");
        write(&refs.join("a/notes.txt"), b"ignored");

        assert_eq!(fixtures.ensure_sample_images(&SampleImages::GENERAL).unwrap(), 2);
        let images = tmp.path().join("images");
        assert_eq!(fs::read(images.join("qa-001.jpg")).unwrap(), b"first");
        assert_eq!(fs::read(images.join("qa-002.png")).unwrap(), b"second");
    }

    #[test]
    fn test_existing_images_are_kept() {
        let (tmp, fixtures) = setup();
        write(&tmp.path().join("images/own.webp"), b"own");
        write(&tmp.path().join("references/r.png"), b"ref");

        assert_eq!(fixtures.ensure_sample_images(&SampleImages::GENERAL).unwrap(), 1);
        assert!(!tmp.path().join("images/qa-001.png").exists());
    }

    #[test]
    fn test_limit_applies() {
        let (tmp, fixtures) = setup();
        for i in 0..12 {
            write(&tmp.path().join(format!("references/r{:02}.png", i)), b"x");
        }
        assert_eq!(fixtures.ensure_sample_images(&SampleImages::GENERAL).unwrap(), 8);
    }

    #[test]
    fn test_density_plans_seed_ten_with_prefix() {
        let (tmp, fixtures) = setup();
        for i in 0..12 {
            write(&tmp.path().join(format!("references/r{:02}.png", i)), b"x");
        }
        assert_eq!(fixtures.ensure_sample_images(&SampleImages::LAYOUT_DENSITY).unwrap(), 10);
        let images = tmp.path().join("images");
        assert!(images.join("qa-density-001.png").exists());
        assert!(images.join("qa-density-010.png").exists());
        assert!(!images.join("qa-001.png").exists());
    }

    #[test]
    fn test_copy_density_prefix() {
        let (tmp, fixtures) = setup();
        write(&tmp.path().join("references/r.JPG"), b"x");
        assert_eq!(fixtures.ensure_sample_images(&SampleImages::COPY_DENSITY).unwrap(), 1);
        assert!(tmp.path().join("images/qa-copy-001.jpg").exists());
    }

    #[test]
    fn test_no_references_yields_zero() {
        let (_tmp, fixtures) = setup();
        assert_eq!(fixtures.ensure_sample_images(&SampleImages::GENERAL).unwrap(), 0);
        assert_eq!(fixtures.touch_first_reference().unwrap(), None);
    }

    #[test]
    fn test_touch_moves_mtime_forward() {
        let (tmp, fixtures) = setup();
        write(&tmp.path().join("references/B.png"), b"b");
        write(&tmp.path().join("references/a.png"), b"a");

        let before = SystemTime::now();
        let touched = fixtures.touch_first_reference().unwrap().unwrap();
        assert!(touched.ends_with("a.png"));
        let modified = fs::metadata(&touched).unwrap().modified().unwrap();
        assert!(modified > before);
    }
}
