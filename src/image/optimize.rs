//! Optimizer abstraction and the external-binary implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};

use super::ImageKind;
use crate::utils::exec::Cmd;

/// Losslessly shrinks image bytes.
pub trait Optimizer: Send + Sync {
    /// Identifies the tool and flags used for `kind`; part of the cache key.
    fn signature(&self, kind: ImageKind) -> String;

    /// Optimize `input`.
    ///
    /// Returns `Ok(None)` when no tool is available for `kind`.
    fn optimize(&self, kind: ImageKind, input: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Command line of one optimizer binary.
struct Tool {
    program: &'static str,
    args: &'static [&'static str],
    /// Flag preceding the output path; the input path goes last.
    output_flag: &'static str,
}

const GIFSICLE: Tool = Tool {
    program: "gifsicle",
    args: &["--no-warnings", "--no-app-extensions", "--optimize=1"],
    output_flag: "-o",
};

const JPEGTRAN: Tool = Tool {
    program: "jpegtran",
    args: &["-copy", "none", "-optimize"],
    output_flag: "-outfile",
};

const OPTIPNG: Tool = Tool {
    program: "optipng",
    args: &["-quiet", "-strip", "all", "-o3"],
    output_flag: "-out",
};

const fn tool_for(kind: ImageKind) -> &'static Tool {
    match kind {
        ImageKind::Gif => &GIFSICLE,
        ImageKind::Jpeg => &JPEGTRAN,
        ImageKind::Png => &OPTIPNG,
    }
}

/// Runs `gifsicle`, `jpegtran` and `optipng` found on `PATH`.
pub struct ExternalOptimizer {
    gif: Option<PathBuf>,
    jpeg: Option<PathBuf>,
    png: Option<PathBuf>,
    /// Scratch directory for tool input/output files.
    tmp_dir: PathBuf,
    counter: AtomicUsize,
}

impl ExternalOptimizer {
    /// Locate the tools with `which`.
    pub fn detect(tmp_dir: &Path) -> Self {
        let find = |kind: ImageKind| which::which(tool_for(kind).program).ok();
        Self {
            gif: find(ImageKind::Gif),
            jpeg: find(ImageKind::Jpeg),
            png: find(ImageKind::Png),
            tmp_dir: tmp_dir.to_path_buf(),
            counter: AtomicUsize::new(0),
        }
    }

    fn tool_path(&self, kind: ImageKind) -> Option<&Path> {
        match kind {
            ImageKind::Gif => self.gif.as_deref(),
            ImageKind::Jpeg => self.jpeg.as_deref(),
            ImageKind::Png => self.png.as_deref(),
        }
    }

    /// Unique scratch file paths for one invocation.
    fn scratch_paths(&self, kind: ImageKind) -> (PathBuf, PathBuf) {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let stem = format!("{}-{n}", std::process::id());
        let ext = kind.name();
        (
            self.tmp_dir.join(format!("{stem}.in.{ext}")),
            self.tmp_dir.join(format!("{stem}.out.{ext}")),
        )
    }
}

impl Optimizer for ExternalOptimizer {
    fn signature(&self, kind: ImageKind) -> String {
        let tool = tool_for(kind);
        format!("{} {}", tool.program, tool.args.join(" "))
    }

    fn optimize(&self, kind: ImageKind, input: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(program) = self.tool_path(kind) else {
            return Ok(None);
        };
        let tool = tool_for(kind);

        fs::create_dir_all(&self.tmp_dir)
            .with_context(|| format!("Failed to create {}", self.tmp_dir.display()))?;
        let (in_path, out_path) = self.scratch_paths(kind);
        fs::write(&in_path, input)
            .with_context(|| format!("Failed to write {}", in_path.display()))?;

        let result = Cmd::new(program)
            .args(tool.args)
            .arg(tool.output_flag)
            .arg(&out_path)
            .arg(&in_path)
            .run()
            .and_then(|_| {
                fs::read(&out_path)
                    .with_context(|| format!("`{}` produced no output", tool.program))
            });

        let _ = fs::remove_file(&in_path);
        let _ = fs::remove_file(&out_path);
        result.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_signature_includes_flags() {
        let dir = TempDir::new().unwrap();
        let optimizer = ExternalOptimizer::detect(dir.path());
        assert_eq!(
            optimizer.signature(ImageKind::Gif),
            "gifsicle --no-warnings --no-app-extensions --optimize=1"
        );
        assert_eq!(
            optimizer.signature(ImageKind::Jpeg),
            "jpegtran -copy none -optimize"
        );
        assert_eq!(
            optimizer.signature(ImageKind::Png),
            "optipng -quiet -strip all -o3"
        );
    }

    #[test]
    fn test_missing_tool_yields_none() {
        let dir = TempDir::new().unwrap();
        let optimizer = ExternalOptimizer {
            gif: None,
            jpeg: None,
            png: None,
            tmp_dir: dir.path().to_path_buf(),
            counter: AtomicUsize::new(0),
        };
        assert!(optimizer.optimize(ImageKind::Png, b"png").unwrap().is_none());
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let dir = TempDir::new().unwrap();
        let optimizer = ExternalOptimizer::detect(dir.path());
        let (a, _) = optimizer.scratch_paths(ImageKind::Png);
        let (b, _) = optimizer.scratch_paths(ImageKind::Png);
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with(".in.png"));
    }
}
