//! `sprite`: bundle the icon set into `svg/sprite.svg` in the source tree.

use std::fs;
use std::sync::LazyLock;

use super::{TaskError, TaskReport, io_error};
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::sprite::{assemble, symbol, symbol_id};
use crate::utils::fs::write_file;
use crate::utils::glob::FileSet;

const SVG_DIR: &str = "svg";
const SPRITE_FILE: &str = "sprite.svg";

static ICONS: LazyLock<FileSet> =
    LazyLock::new(|| FileSet::new(&["*.svg"], &[SPRITE_FILE]).expect("valid icons glob"));

pub(super) fn run(config: &PipelineConfig) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Sprite);
    let svg_dir = config.source_join(SVG_DIR);

    let icons = ICONS.collect(&svg_dir).map_err(io_error(&svg_dir))?;
    if icons.is_empty() {
        return Ok(report);
    }

    let mut symbols = Vec::with_capacity(icons.len());
    for icon in &icons {
        let source = fs::read_to_string(icon).map_err(io_error(icon))?;
        let stem = icon
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let symbol = symbol(&symbol_id(&stem), &source).map_err(|source| TaskError::Sprite {
            path: icon.clone(),
            source,
        })?;
        symbols.push(symbol);
    }

    let output = svg_dir.join(SPRITE_FILE);
    write_file(&output, assemble(&symbols)).map_err(io_error(&output))?;
    report.written.push(output);
    Ok(report)
}
