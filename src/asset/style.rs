//! Stylesheet pipeline: Sass compilation, media query merging, vendor
//! prefixing and minification.

use std::io;
use std::path::{Path, PathBuf};

use grass::{Fs, StdFs};
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;

use super::Diagnostic;

/// Compile a `.sass` or `.scss` file.
///
/// The syntax follows the extension; `@use`/`@import` also resolve against
/// the entry's directory.
pub fn compile_sass(entry: &Path) -> Result<String, Diagnostic> {
    let mut options = grass::Options::default().fs(&IndentedImports);
    if let Some(dir) = entry.parent() {
        options = options.load_path(dir);
    }
    grass::from_path(entry, &options).map_err(Diagnostic::new)
}

/// Disk access for the compiler that quotes bare `@import` targets in
/// indented-syntax files, which grass only accepts as strings.
#[derive(Debug)]
struct IndentedImports;

impl Fs for IndentedImports {
    fn is_dir(&self, path: &Path) -> bool {
        StdFs.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        StdFs.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = StdFs.read(path)?;
        if path.extension().is_none_or(|ext| ext != "sass") {
            return Ok(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(source) => Ok(quote_bare_imports(&source).into_bytes()),
            Err(err) => Ok(err.into_bytes()),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        StdFs.canonicalize(path)
    }
}

/// Rewrite `@import a, b` lines as `@import "a", "b"`.
fn quote_bare_imports(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    for line in source.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let eol = &line[body.len()..];
        let trimmed = body.trim_start();
        let Some(targets) = trimmed
            .strip_prefix("@import")
            .filter(|rest| rest.starts_with([' ', '\t']))
        else {
            out.push_str(line);
            continue;
        };

        out.push_str(&body[..body.len() - trimmed.len()]);
        out.push_str("@import ");
        let quoted: Vec<String> = targets
            .split(',')
            .map(str::trim)
            .map(|target| {
                if target.starts_with(['"', '\'']) || target.starts_with("url(") {
                    target.to_string()
                } else {
                    format!("\"{target}\"")
                }
            })
            .collect();
        out.push_str(&quoted.join(", "));
        out.push_str(eol);
    }
    out
}

/// Resolve browserslist queries into lightningcss targets.
pub fn targets(browsers: &[String]) -> Result<Targets, Diagnostic> {
    let browsers = Browsers::from_browserslist(browsers).map_err(Diagnostic::new)?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

/// Merge media queries, add vendor prefixes and minify compiled CSS.
pub fn finish_css(css: &str, browsers: &[String]) -> Result<String, Diagnostic> {
    let targets = targets(browsers)?;

    let mut sheet = StyleSheet::parse(css, ParserOptions::default()).map_err(Diagnostic::new)?;
    merge_media_queries(&mut sheet.rules.0);

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(Diagnostic::new)?;

    let result = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(Diagnostic::new)?;
    Ok(result.code)
}

/// Merge top-level `@media` rules with identical conditions.
///
/// Merged blocks move after all other rules, in order of first appearance.
fn merge_media_queries(rules: &mut Vec<CssRule<'_>>) {
    let mut plain = Vec::with_capacity(rules.len());
    let mut media: Vec<(String, CssRule<'_>)> = Vec::new();

    for rule in rules.drain(..) {
        let mut current = match rule {
            CssRule::Media(rule) => rule,
            other => {
                plain.push(other);
                continue;
            }
        };
        let Ok(key) = current.query.to_css_string(PrinterOptions::default()) else {
            plain.push(CssRule::Media(current));
            continue;
        };

        match media.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, CssRule::Media(merged))) => merged.rules.0.append(&mut current.rules.0),
            _ => media.push((key, CssRule::Media(current))),
        }
    }

    plain.extend(media.into_iter().map(|(_, rule)| rule));
    *rules = plain;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn browsers() -> Vec<String> {
        vec!["last 10 versions".to_string()]
    }

    #[test]
    fn test_compile_indented_sass_with_partial() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_vars.sass"), "$accent: #c00\n").unwrap();
        let entry = dir.path().join("main.sass");
        fs::write(&entry, "@import vars\n.btn\n  color: $accent\n").unwrap();

        let css = compile_sass(&entry).unwrap();
        assert!(css.contains(".btn"));
        assert!(css.contains("#c00"));
    }

    #[test]
    fn test_compile_sass_partial_with_bare_import() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_colors.sass"), "$accent: #0a0\n").unwrap();
        fs::write(dir.path().join("_base.sass"), "@import colors\nbody\n  color: $accent\n").unwrap();
        let entry = dir.path().join("main.sass");
        fs::write(&entry, "@import base, \"colors\"\n").unwrap();

        let css = compile_sass(&entry).unwrap();
        assert!(css.contains("body"), "{css}");
        assert!(css.contains("#0a0"), "{css}");
    }

    #[test]
    fn test_quote_bare_imports() {
        let source = "@import vars, 'mixins'\r\n.a\n  @import url(x.css)\n  @import nested\n";
        assert_eq!(
            quote_bare_imports(source),
            "@import \"vars\", 'mixins'\r\n.a\n  @import url(x.css)\n  @import \"nested\"\n"
        );
        assert_eq!(quote_bare_imports("@importer x\n"), "@importer x\n");
    }

    #[test]
    fn test_compile_error_is_diagnostic() {
        let dir = TempDir::new().unwrap();
        let entry = dir.path().join("main.scss");
        fs::write(&entry, ".a { color: $missing; }").unwrap();

        let err = compile_sass(&entry).unwrap_err();
        assert!(err.to_string().contains("Undefined variable"));
    }

    #[test]
    fn test_identical_media_queries_merged() {
        let css = "\
            a { color: red }\
            @media (max-width: 600px) { a { color: blue } }\
            b { color: green }\
            @media (max-width: 600px) { b { color: black } }";

        let out = finish_css(css, &browsers()).unwrap();
        assert_eq!(out.matches("@media").count(), 1);

        let media = out.find("@media").unwrap();
        let plain_b = out.find("b{").unwrap();
        assert!(plain_b < media, "media block must follow plain rules: {out}");
    }

    #[test]
    fn test_distinct_media_queries_keep_first_appearance_order() {
        let css = "\
            @media print { a { color: red } }\
            @media (min-width: 900px) { a { color: blue } }\
            @media print { b { color: red } }";

        let out = finish_css(css, &browsers()).unwrap();
        assert_eq!(out.matches("@media").count(), 2);
        assert!(out.find("print").unwrap() < out.find("900px").unwrap());
    }

    #[test]
    fn test_vendor_prefixes_added() {
        let out = finish_css(".x { user-select: none }", &browsers()).unwrap();
        assert!(out.contains("-webkit-user-select"), "{out}");
    }

    #[test]
    fn test_invalid_css_is_diagnostic() {
        assert!(finish_css("..a { color: red }", &browsers()).is_err());
    }

    #[test]
    fn test_invalid_browser_query() {
        assert!(targets(&["definitely not a browser 99".to_string()]).is_err());
    }
}
