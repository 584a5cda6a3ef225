//! Task runners.
//!
//! Each task reads its inputs from the source tree, writes its outputs and
//! returns a [`TaskReport`]. Authoring errors of intercepting tasks become
//! [`Notice`]s on the report; everything else is a [`TaskError`].
//!
//! # Module Structure
//!
//! ```text
//! task/
//! ├── pages.rs         # *.pug -> *.html
//! ├── styles.rs        # main.sass -> css/main.min.css
//! ├── scripts.rs       # *.js -> scripts/*.min.js
//! ├── images.rs        # img/** -> optimized img/**
//! ├── sprite.rs        # svg/*.svg -> svg/sprite.svg
//! ├── housekeeping.rs  # clean, clear
//! └── mod.rs           # TaskContext, run_task (this file)
//! ```

mod housekeeping;
mod images;
mod pages;
mod scripts;
mod sprite;
mod styles;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::asset::Diagnostic;
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::image::{ExternalOptimizer, Optimizer};
use crate::logger;
use crate::reload::ReloadHub;
use crate::sprite::SpriteError;
use crate::utils::glob::relative_slash;

/// Scratch directory for optimizer input/output, under the cache root.
const OPTIMIZER_TMP_DIR: &str = "tmp";

/// A recoverable authoring error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Name of the task that raised it.
    pub title: String,
    pub message: String,
}

/// Outcome of one task run.
#[derive(Debug)]
pub struct TaskReport {
    pub task: Task,
    /// Output files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Outputs served from the image cache.
    pub cached: usize,
    /// Outputs copied without optimization.
    pub copied: usize,
    /// Files or cache entries deleted by housekeeping tasks.
    pub removed: usize,
    pub notices: Vec<Notice>,
}

impl TaskReport {
    fn new(task: Task) -> Self {
        Self {
            task,
            written: Vec::new(),
            cached: 0,
            copied: 0,
            removed: 0,
            notices: Vec::new(),
        }
    }

    fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(Notice {
            title: self.task.name().to_string(),
            message: message.into(),
        });
    }

    /// One-line description for the console.
    pub fn summary(&self) -> String {
        if matches!(self.task, Task::Clean | Task::Clear) {
            return format!("removed {}", count(self.removed, "file"));
        }

        let mut summary = format!("wrote {}", count(self.written.len(), "file"));
        if self.cached > 0 {
            summary.push_str(&format!(", {} from cache", self.cached));
        }
        if self.copied > 0 {
            summary.push_str(&format!(", {} copied unchanged", self.copied));
        }
        if !self.notices.is_empty() {
            summary.push_str(&format!(", {}", count(self.notices.len(), "notice")));
        }
        summary
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Unrecoverable failure of a task run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{}: {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: Diagnostic,
    },

    #[error("{}: {message}", .path.display())]
    Image { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Sprite {
        path: PathBuf,
        #[source]
        source: SpriteError,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Map an IO error onto the path it concerns.
fn io_error(path: &Path) -> impl FnOnce(io::Error) -> TaskError + '_ {
    move |source| TaskError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Everything a task run needs besides its inputs.
#[derive(Clone)]
pub struct TaskContext {
    pub config: Arc<PipelineConfig>,
    hub: Option<ReloadHub>,
    optimizer: Arc<dyn Optimizer>,
}

impl TaskContext {
    /// Context using the optimizer binaries found on `PATH`.
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let optimizer = ExternalOptimizer::detect(&config.cache_dir().join(OPTIMIZER_TMP_DIR));
        Self {
            config,
            hub: None,
            optimizer: Arc::new(optimizer),
        }
    }

    /// Publish notices and reload signals to browsers.
    pub fn with_hub(mut self, hub: ReloadHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn hub(&self) -> Option<&ReloadHub> {
        self.hub.as_ref()
    }
}

/// Run one task and publish its outcome.
pub fn run_task(task: Task, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    let config = ctx.config.as_ref();
    let report = match task {
        Task::Pages => pages::run(config)?,
        Task::Styles => styles::run(config)?,
        Task::Scripts => scripts::run(config)?,
        Task::Images => images::run(config, ctx.optimizer.as_ref())?,
        Task::Sprite => sprite::run(config)?,
        Task::Clean => housekeeping::clean(config)?,
        Task::Clear => housekeeping::clear(config)?,
    };
    publish(&report, ctx);
    Ok(report)
}

/// Surface notices and send the matching live-reload signal.
fn publish(report: &TaskReport, ctx: &TaskContext) {
    for notice in &report.notices {
        logger::status_error(&notice.title, &notice.message);
        logger::status_detach();
    }

    let Some(hub) = &ctx.hub else { return };

    // The browser keeps one notice per title; later ones would replace earlier.
    for (title, message) in joined_notices(&report.notices) {
        hub.error(title, message);
    }

    if report.notices.is_empty() && report.task.intercepts_errors() {
        hub.clear_error(report.task.name());
    }
    if report.written.is_empty() {
        return;
    }

    if report.written.iter().all(|path| is_stylesheet(path)) {
        for path in &report.written {
            if let Some(target) = relative_slash(path, ctx.config.output_dir()) {
                hub.css(target);
            }
        }
    } else {
        hub.reload();
    }
}

/// Notices merged per title in order of first appearance.
fn joined_notices(notices: &[Notice]) -> Vec<(&str, String)> {
    let mut joined: Vec<(&str, String)> = Vec::new();
    for notice in notices {
        match joined.iter_mut().find(|(title, _)| *title == notice.title) {
            Some((_, message)) => {
                message.push_str("\n\n");
                message.push_str(&notice.message);
            }
            None => joined.push((notice.title.as_str(), notice.message.clone())),
        }
    }
    joined
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "css")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> TaskContext {
        TaskContext::new(Arc::new(PipelineConfig::for_root(dir.path())))
    }

    fn write(dir: &TempDir, rel: &str, contents: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_pages_end_to_end() {
        let dir = TempDir::new().unwrap();
        write(&dir, "app/pages/index.pug", "p Hi");

        let report = run_task(Task::Pages, &context(&dir)).unwrap();
        assert!(report.notices.is_empty());
        assert_eq!(report.written, vec![dir.path().join("dist/index.html")]);

        let html = fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
        assert!(html.contains("<p>Hi</p>"), "{html}");
    }

    #[test]
    fn test_malformed_stylesheet_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        write(&dir, "app/sass/main.sass", ".a\n  color: red\n");

        let first = run_task(Task::Styles, &ctx).unwrap();
        assert!(first.notices.is_empty());
        let output = dir.path().join("dist/css/main.min.css");
        let before = fs::read_to_string(&output).unwrap();

        write(&dir, "app/sass/main.sass", ".a\n  color: $missing\n");
        let second = run_task(Task::Styles, &ctx).unwrap();
        assert_eq!(second.notices.len(), 1);
        assert_eq!(second.notices[0].title, "styles");
        assert!(second.written.is_empty());
        assert_eq!(fs::read_to_string(&output).unwrap(), before);
    }

    #[test]
    fn test_summary() {
        let mut report = TaskReport::new(Task::Images);
        report.written = vec![PathBuf::from("a"), PathBuf::from("b")];
        report.cached = 1;
        assert_eq!(report.summary(), "wrote 2 files, 1 from cache");

        let mut report = TaskReport::new(Task::Clear);
        report.removed = 1;
        assert_eq!(report.summary(), "removed 1 file");
    }

    #[test]
    fn test_task_error_names_file() {
        let err = TaskError::Image {
            path: PathBuf::from("app/img/a.png"),
            message: "Command `optipng` failed".into(),
        };
        assert_eq!(err.to_string(), "app/img/a.png: Command `optipng` failed");
    }

    #[test]
    fn test_notices_joined_per_title() {
        let notice = |title: &str, message: &str| Notice {
            title: title.to_string(),
            message: message.to_string(),
        };
        let notices = [
            notice("pages", "index.pug:2: unexpected"),
            notice("styles", "main.sass: undefined"),
            notice("pages", "about.pug:5: unexpected"),
        ];

        assert_eq!(
            joined_notices(&notices),
            [
                ("pages", "index.pug:2: unexpected\n\nabout.pug:5: unexpected".to_string()),
                ("styles", "main.sass: undefined".to_string()),
            ]
        );
    }

    #[test]
    fn test_is_stylesheet() {
        assert!(is_stylesheet(Path::new("dist/css/main.min.css")));
        assert!(!is_stylesheet(Path::new("dist/index.html")));
    }
}
