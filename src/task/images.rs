//! `images`: optimize every file under the image tree through the cache.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::{TaskError, TaskReport, io_error};
use crate::cache::{CacheKey, ImageCache};
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::image::{ImageKind, Optimizer};
use crate::utils::fs::{mirror, write_file};
use crate::utils::glob::FileSet;
use crate::{debug, log};

const IMAGES_DIR: &str = "img";

static IMAGES: LazyLock<FileSet> =
    LazyLock::new(|| FileSet::new(&["**/*"], &[]).expect("valid images glob"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Optimized,
    Cached,
    Copied,
}

/// Shared state of one run.
struct Run<'a> {
    cache: ImageCache,
    optimizer: &'a dyn Optimizer,
    /// Formats already warned about as having no optimizer.
    missing: Mutex<FxHashSet<ImageKind>>,
}

pub(super) fn run(config: &PipelineConfig, optimizer: &dyn Optimizer) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Images);
    let source_dir = config.source_join(IMAGES_DIR);
    let output_dir = config.output_join(IMAGES_DIR);

    let run = Run {
        cache: ImageCache::new(config.cache_dir()),
        optimizer,
        missing: Mutex::new(FxHashSet::default()),
    };

    let results = IMAGES
        .collect(&source_dir)
        .map_err(io_error(&source_dir))?
        .into_par_iter()
        .filter_map(|path| {
            let output = mirror(&path, &source_dir, &output_dir)?;
            Some(run.process(&path, &output).map(|outcome| (output, outcome)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (output, outcome) in results {
        match outcome {
            Outcome::Optimized => {}
            Outcome::Cached => report.cached += 1,
            Outcome::Copied => report.copied += 1,
        }
        report.written.push(output);
    }
    Ok(report)
}

impl Run<'_> {
    fn process(&self, path: &Path, output: &Path) -> Result<Outcome, TaskError> {
        let input = fs::read(path).map_err(io_error(path))?;

        let Some(kind) = ImageKind::detect(path, &input) else {
            write_file(output, &input).map_err(io_error(output))?;
            return Ok(Outcome::Copied);
        };

        let key = CacheKey::new(&self.optimizer.signature(kind), &input);
        if let Some(bytes) = self.cache.get(key) {
            debug!("images"; "cache hit {} ({key})", path.display());
            write_file(output, bytes).map_err(io_error(output))?;
            return Ok(Outcome::Cached);
        }

        let optimized = self
            .optimizer
            .optimize(kind, &input)
            .map_err(|err| TaskError::Image {
                path: path.to_path_buf(),
                message: format!("{err:#}"),
            })?;

        let Some(optimized) = optimized else {
            if self.missing.lock().insert(kind) {
                log!("warning"; "no {kind} optimizer found on PATH, copying {kind} images unchanged");
            }
            write_file(output, &input).map_err(io_error(output))?;
            return Ok(Outcome::Copied);
        };

        let best = if optimized.len() < input.len() {
            optimized
        } else {
            input
        };
        self.cache.put(key, &best).map_err(io_error(path))?;
        write_file(output, &best).map_err(io_error(output))?;
        Ok(Outcome::Optimized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    /// Halves its input and counts invocations.
    struct CountingOptimizer {
        calls: AtomicUsize,
        available: bool,
    }

    impl CountingOptimizer {
        fn new(available: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                available,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Optimizer for CountingOptimizer {
        fn signature(&self, kind: ImageKind) -> String {
            format!("halve {kind}")
        }

        fn optimize(&self, _kind: ImageKind, input: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.available {
                return Ok(None);
            }
            Ok(Some(input[..input.len() / 2].to_vec()))
        }
    }

    struct FailingOptimizer;

    impl Optimizer for FailingOptimizer {
        fn signature(&self, _kind: ImageKind) -> String {
            "fail".into()
        }

        fn optimize(&self, _kind: ImageKind, _input: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
            anyhow::bail!("Command `optipng` failed with exit status: 1")
        }
    }

    fn png(len: usize) -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(len, 7);
        bytes
    }

    fn setup(files: &[(&str, Vec<u8>)]) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        for (rel, bytes) in files {
            let path = dir.path().join("app/img").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        let config = PipelineConfig::for_root(dir.path());
        (dir, config)
    }

    #[test]
    fn test_cached_rerun_skips_optimizer() {
        let (dir, config) = setup(&[("a.png", png(64)), ("icons/b.png", png(32))]);

        let first = CountingOptimizer::new(true);
        let report = run(&config, &first).unwrap();
        assert_eq!(first.calls(), 2);
        assert_eq!(report.cached, 0);
        assert_eq!(fs::read(dir.path().join("dist/img/a.png")).unwrap().len(), 32);
        assert_eq!(fs::read(dir.path().join("dist/img/icons/b.png")).unwrap().len(), 16);

        let second = CountingOptimizer::new(true);
        let report = run(&config, &second).unwrap();
        assert_eq!(second.calls(), 0);
        assert_eq!(report.cached, 2);
        assert_eq!(fs::read(dir.path().join("dist/img/a.png")).unwrap().len(), 32);
    }

    #[test]
    fn test_non_images_copied_unchanged() {
        let (dir, config) = setup(&[("notes.txt", b"hello".to_vec())]);
        let optimizer = CountingOptimizer::new(true);

        let report = run(&config, &optimizer).unwrap();
        assert_eq!(optimizer.calls(), 0);
        assert_eq!(report.copied, 1);
        assert_eq!(fs::read(dir.path().join("dist/img/notes.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_missing_tool_copies_without_caching() {
        let (dir, config) = setup(&[("a.png", png(64))]);

        let missing = CountingOptimizer::new(false);
        let report = run(&config, &missing).unwrap();
        assert_eq!(report.copied, 1);
        assert_eq!(fs::read(dir.path().join("dist/img/a.png")).unwrap(), png(64));

        let again = CountingOptimizer::new(false);
        run(&config, &again).unwrap();
        assert_eq!(again.calls(), 1);
    }

    #[test]
    fn test_optimizer_failure_is_task_error() {
        let (_dir, config) = setup(&[("a.png", png(64))]);
        let err = run(&config, &FailingOptimizer).unwrap_err();
        assert!(matches!(err, TaskError::Image { .. }));
        assert!(err.to_string().contains("optipng"));
    }

    #[test]
    fn test_larger_output_keeps_input() {
        struct Inflating;
        impl Optimizer for Inflating {
            fn signature(&self, _kind: ImageKind) -> String {
                "inflate".into()
            }
            fn optimize(&self, _kind: ImageKind, input: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
                Ok(Some([input, input].concat()))
            }
        }

        let (dir, config) = setup(&[("a.png", png(20))]);
        run(&config, &Inflating).unwrap();
        assert_eq!(fs::read(dir.path().join("dist/img/a.png")).unwrap(), png(20));
    }
}
