//! Lossless image optimization.
//!
//! Formats are detected from content, falling back to the file extension.
//! Optimization itself is delegated to an [`Optimizer`].

mod optimize;

pub use optimize::{ExternalOptimizer, Optimizer};

use std::fmt;
use std::path::Path;

/// Image formats with a lossless optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Gif,
    Jpeg,
    Png,
}

impl ImageKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    /// Detect the format of `bytes`, using `path`'s extension when the
    /// content is not recognized.
    ///
    /// Returns `None` for files no optimizer handles (copied unchanged).
    pub fn detect(path: &Path, bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Gif) => Some(Self::Gif),
            Ok(image::ImageFormat::Jpeg) => Some(Self::Jpeg),
            Ok(image::ImageFormat::Png) => Some(Self::Png),
            Ok(_) => None,
            Err(_) => Self::from_extension(path),
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
