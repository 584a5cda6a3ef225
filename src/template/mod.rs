//! Static Pug template renderer.
//!
//! Supports the markup-only part of the language: indentation nesting,
//! tags with shorthand classes/ids and literal attributes, text forms,
//! comments, `include` and `extends`/`block`. Constructs that need a
//! JavaScript runtime are rejected with a line-numbered error.
//!
//! # Module Structure
//!
//! ```text
//! template/
//! ├── lexer.rs    # Line splitting, indentation
//! ├── node.rs     # Syntax tree
//! ├── parser.rs   # Lines -> nodes
//! ├── loader.rs   # include / extends / block resolution
//! ├── render.rs   # Nodes -> HTML
//! └── mod.rs      # Renderer, TemplateError (this file)
//! ```

mod lexer;
mod loader;
mod node;
mod parser;
mod render;

use std::path::{Path, PathBuf};

use thiserror::Error;

use loader::Loader;

/// A template failed to parse or resolve.
#[derive(Debug, Error)]
#[error("{}{}: {message}", .path.display(), line_suffix(.line))]
pub struct TemplateError {
    /// File the error was found in.
    pub path: PathBuf,
    /// 1-based line number, 0 when the error concerns the whole file.
    pub line: usize,
    pub message: String,
}

impl TemplateError {
    pub(crate) fn new(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

fn line_suffix(line: &usize) -> String {
    if *line == 0 {
        String::new()
    } else {
        format!(":{line}")
    }
}

/// Renders template files to (unformatted) HTML.
#[derive(Debug, Clone)]
pub struct Renderer {
    basedir: PathBuf,
}

impl Renderer {
    /// `basedir` anchors absolute include paths such as `/partials/nav`.
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
        }
    }

    pub fn render_file(&self, path: &Path) -> Result<String, TemplateError> {
        let nodes = Loader::new(&self.basedir).load_file(path)?;
        Ok(render::render(&nodes))
    }

    /// Render source text; relative includes resolve against `path`.
    pub fn render_str(&self, source: &str, path: &Path) -> Result<String, TemplateError> {
        let nodes = Loader::new(&self.basedir).load_str(source, path)?;
        Ok(render::render(&nodes))
    }
}
