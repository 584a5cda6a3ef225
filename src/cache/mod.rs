//! Content-addressed store for optimized images.
//!
//! Entries live at `<cache>/images/<2-hex>/<64-hex>`, keyed by a blake3
//! digest of the cache format version, the optimizer signature and the
//! input bytes. Identical inputs optimized the same way are never
//! re-processed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

/// Bumped when the stored representation changes.
const CACHE_VERSION: u32 = 1;

/// Subdirectory of the cache root holding image entries.
const IMAGES_DIR: &str = "images";

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Key for `input` optimized by the optimizer identified by `signature`.
    pub fn new(signature: &str, input: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&CACHE_VERSION.to_le_bytes());
        hasher.update(signature.as_bytes());
        hasher.update(&[0]);
        hasher.update(input);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars are enough for logs.
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Persistent image-optimization cache.
#[derive(Debug, Clone)]
pub struct ImageCache {
    root: PathBuf,
}

impl ImageCache {
    /// Open the cache under `cache_dir` (created lazily on first write).
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            root: cache_dir.join(IMAGES_DIR),
        }
    }

    fn entry_path(&self, key: CacheKey) -> PathBuf {
        let hex = key.to_hex();
        self.root.join(&hex[..2]).join(hex)
    }

    /// Cached bytes for `key`, if present.
    pub fn get(&self, key: CacheKey) -> Option<Vec<u8>> {
        fs::read(self.entry_path(key)).ok()
    }

    /// Store bytes under `key`.
    ///
    /// Written to a temporary sibling and renamed, so readers never see a
    /// partial entry.
    pub fn put(&self, key: CacheKey, bytes: &[u8]) -> io::Result<()> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension(format!("tmp{}", std::process::id()));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)
    }

    /// Delete every entry, returning how many were removed.
    pub fn clear(&self) -> io::Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in WalkDir::new(&self.root).parallelism(Parallelism::Serial) {
            if entry?.file_type().is_file() {
                count += 1;
            }
        }
        fs::remove_dir_all(&self.root)?;
        Ok(count)
    }
}
