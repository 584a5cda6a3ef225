//! `clean` and `clear`.

use std::sync::LazyLock;

use super::{TaskError, TaskReport, io_error};
use crate::cache::ImageCache;
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::utils::fs::remove_dir_all_if_exists;
use crate::utils::glob::FileSet;

static ALL_FILES: LazyLock<FileSet> =
    LazyLock::new(|| FileSet::new(&["**/*"], &[]).expect("valid glob"));

/// Delete the output tree. An absent tree is not an error.
pub(super) fn clean(config: &PipelineConfig) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Clean);
    let output = config.output_dir();

    report.removed = ALL_FILES.collect(output).map_err(io_error(output))?.len();
    remove_dir_all_if_exists(output).map_err(io_error(output))?;
    Ok(report)
}

/// Invalidate the image-optimization cache.
pub(super) fn clear(config: &PipelineConfig) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Clear);
    report.removed = ImageCache::new(config.cache_dir())
        .clear()
        .map_err(io_error(config.cache_dir()))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_output_tree() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::for_root(dir.path());
        fs::create_dir_all(dir.path().join("dist/css")).unwrap();
        fs::write(dir.path().join("dist/index.html"), "x").unwrap();
        fs::write(dir.path().join("dist/css/main.min.css"), "x").unwrap();

        let report = clean(&config).unwrap();
        assert_eq!(report.removed, 2);
        assert!(!dir.path().join("dist").exists());

        let again = clean(&config).unwrap();
        assert_eq!(again.removed, 0);
    }

    #[test]
    fn test_clean_keeps_source_and_cache() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::for_root(dir.path());
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/a.pug"), "p").unwrap();

        clean(&config).unwrap();
        assert!(dir.path().join("app/a.pug").exists());
    }

    #[test]
    fn test_clear_empties_cache() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::for_root(dir.path());
        let cache = ImageCache::new(config.cache_dir());
        cache.put(CacheKey::new("sig", b"a"), b"x").unwrap();
        cache.put(CacheKey::new("sig", b"b"), b"y").unwrap();

        let report = clear(&config).unwrap();
        assert_eq!(report.removed, 2);
        assert!(cache.get(CacheKey::new("sig", b"a")).is_none());
        assert_eq!(clear(&config).unwrap().removed, 0);
    }
}
