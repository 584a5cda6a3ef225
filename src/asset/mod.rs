//! Stylesheet and script processing.
//!
//! Sass is compiled with grass, CSS is post-processed and minified with
//! lightningcss and JavaScript is minified with oxc.

pub mod script;
pub mod style;

use thiserror::Error;

/// A compiler or minifier rejected its input.
///
/// Carries the collaborator's message verbatim; callers attach the file.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Diagnostic(pub String);

impl Diagnostic {
    pub fn new(message: impl ToString) -> Self {
        Self(message.to_string())
    }
}
