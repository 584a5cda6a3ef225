//! `pages`: render top-level templates into formatted HTML.

use std::sync::LazyLock;

use super::{TaskError, TaskReport, io_error};
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::debug;
use crate::template::{Renderer, TemplateError};
use crate::utils::fs::write_file;
use crate::utils::glob::FileSet;
use crate::utils::html::prettify;

const PAGES_DIR: &str = "pages";

static PAGES: LazyLock<FileSet> =
    LazyLock::new(|| FileSet::new(&["*.pug"], &[]).expect("valid pages glob"));

pub(super) fn run(config: &PipelineConfig) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Pages);
    let renderer = Renderer::new(config.source_dir());

    let pages_dir = config.source_join(PAGES_DIR);
    for page in PAGES.collect(&pages_dir).map_err(io_error(&pages_dir))? {
        let html = match renderer.render_file(&page) {
            Ok(html) => prettify(&html),
            Err(err) => {
                report.notice(describe(config, &err));
                continue;
            }
        };

        let stem = page
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let output = config.output_join(format!("{stem}.html"));
        write_file(&output, html).map_err(io_error(&output))?;
        debug!("pages"; "{}", config.display_path(&output));
        report.written.push(output);
    }

    Ok(report)
}

/// Template error with the path shown relative to the project root.
fn describe(config: &PipelineConfig, err: &TemplateError) -> String {
    let path = config.display_path(&err.path);
    if err.line == 0 {
        format!("{path}: {}", err.message)
    } else {
        format!("{path}:{}: {}", err.line, err.message)
    }
}
