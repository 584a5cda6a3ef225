//! JavaScript minification with oxc.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::Diagnostic;

/// Minify a classic (non-module) script.
///
/// Top-level names stay global, so inline handlers and other scripts that
/// reference them keep working. Comments are dropped.
pub fn minify_script(source: &str) -> Result<String, Diagnostic> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(Diagnostic::new(error));
    }
    if ret.panicked {
        return Err(Diagnostic::new("unrecoverable syntax error"));
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r"
        // toggles the menu
        function toggleMenu(menu) {
            var open = menu.classList.contains('open');
            menu.classList.toggle('open', !open);
            return !open;
        }
        document.addEventListener('click', function (event) {
            toggleMenu(event.target);
        });
    ";

    #[test]
    fn test_minify_drops_comments_and_whitespace() {
        let code = minify_script(SOURCE).unwrap();
        assert!(!code.contains("toggles the menu"));
        assert!(code.len() < SOURCE.len() / 2);
    }

    #[test]
    fn test_top_level_names_survive() {
        let code = minify_script(SOURCE).unwrap();
        assert!(code.contains("toggleMenu"));
    }

    #[test]
    fn test_unused_globals_are_kept() {
        let code = minify_script("var config = { debug: true };\nfunction init() {}\n").unwrap();
        assert!(code.contains("config"), "{code}");
        assert!(code.contains("init"), "{code}");
    }

    #[test]
    fn test_reminify_is_unchanged() {
        let once = minify_script(SOURCE).unwrap();
        let twice = minify_script(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_syntax_error() {
        let err = minify_script("function (").unwrap_err();
        assert!(!err.0.is_empty());
    }
}
