//! Glob matching and file collection.
//!
//! Patterns are matched against `/`-separated paths relative to a base
//! directory. `*` does not cross directory boundaries; `**` does.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

/// Include patterns minus exclude patterns.
#[derive(Clone)]
pub struct FileSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for FileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("include", &self.include.len())
            .field("exclude", &self.exclude.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl FileSet {
    pub fn new(include: &[&str], exclude: &[&str]) -> Result<Self> {
        let include = build_globset(include).context("building include globset")?;
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self { include, exclude })
    }

    /// Whether a `/`-separated relative path belongs to the set.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path)
            && !self
                .exclude
                .as_ref()
                .is_some_and(|exclude| exclude.is_match(rel_path))
    }

    /// Collect matching files under `base`, sorted by path.
    ///
    /// A missing `base` yields no files. The walk runs on the calling thread,
    /// so it is safe to call from rayon tasks.
    pub fn collect(&self, base: &Path) -> io::Result<Vec<PathBuf>> {
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(base)
            .sort(true)
            .parallelism(Parallelism::Serial)
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if relative_slash(&path, base).is_some_and(|rel| self.matches(&rel)) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// `path` relative to `base`, with `/` separators on every platform.
pub fn relative_slash(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}
