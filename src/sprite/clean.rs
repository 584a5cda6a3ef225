//! Icon cleanup passes run before an icon becomes a `<symbol>`.

use super::tree::{SvgElement, SvgNode};

const EDITOR_PREFIXES: &[&str] = &["sodipodi:", "inkscape:", "sketch:"];
const EDITOR_XMLNS: &[&str] = &["xmlns:sodipodi", "xmlns:inkscape", "xmlns:sketch"];
const DROPPED_ATTRS: &[&str] = &["version", "xml:space", "enable-background"];
const DROPPED_ELEMENTS: &[&str] = &["metadata", "title", "desc"];
const PRESENTATION_ATTRS: &[&str] = &["fill", "stroke", "style"];

fn is_editor_name(name: &str) -> bool {
    EDITOR_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Remove editor metadata and redundant structure.
pub(super) fn minify(el: &mut SvgElement) {
    el.attrs.retain(|(key, _)| {
        !is_editor_name(key)
            && !EDITOR_XMLNS.contains(&key.as_str())
            && !DROPPED_ATTRS.contains(&key.as_str())
    });

    let children = std::mem::take(&mut el.children);
    for child in children {
        match child {
            SvgNode::Element(mut child) => {
                if DROPPED_ELEMENTS.contains(&child.name.as_str()) || is_editor_name(&child.name) {
                    continue;
                }
                minify(&mut child);
                match child.name.as_str() {
                    "g" | "defs" if child.children.is_empty() => {}
                    "g" if child.attrs.is_empty() => el.children.append(&mut child.children),
                    _ => el.children.push(SvgNode::Element(child)),
                }
            }
            SvgNode::Text(text) if text.trim().is_empty() => {}
            other => el.children.push(other),
        }
    }
}

/// Strip `fill`, `stroke` and `style` attributes and `<style>` elements so
/// icons inherit colors from the page.
pub(super) fn strip_presentation(el: &mut SvgElement) {
    el.attrs
        .retain(|(key, _)| !PRESENTATION_ATTRS.contains(&key.as_str()));
    el.children.retain_mut(|child| match child {
        SvgNode::Element(child) if child.name == "style" => false,
        SvgNode::Element(child) => {
            strip_presentation(child);
            true
        }
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::super::tree::{parse, write};
    use super::*;

    fn cleaned(source: &str) -> String {
        let mut root = parse(source).unwrap();
        minify(&mut root);
        strip_presentation(&mut root);
        let mut out = String::new();
        write(&root, &mut out);
        out
    }

    #[test]
    fn test_minify_drops_editor_noise() {
        let svg = r#"<svg xmlns:sodipodi="x" version="1.1" sodipodi:docname="a.svg" viewBox="0 0 1 1">
  <metadata>m</metadata>
  <title>Icon</title>
  <sodipodi:namedview id="nv"/>
  <path d="M0 0"/>
</svg>"#;
        assert_eq!(cleaned(svg), r#"<svg viewBox="0 0 1 1"><path d="M0 0"/></svg>"#);
    }

    #[test]
    fn test_minify_collapses_groups() {
        let svg = r#"<svg><g><g><path d="M0"/></g></g><g id="keep"><path d="M1"/></g><defs/><g></g></svg>"#;
        assert_eq!(
            cleaned(svg),
            r#"<svg><path d="M0"/><g id="keep"><path d="M1"/></g></svg>"#
        );
    }

    #[test]
    fn test_strip_presentation() {
        let svg = r##"<svg fill="none"><style>.a{fill:red}</style><path class="a" fill="#000" stroke="red" style="opacity:.5" d="M0"/></svg>"##;
        assert_eq!(cleaned(svg), r#"<svg><path class="a" d="M0"/></svg>"#);
    }

    #[test]
    fn test_text_content_kept() {
        assert_eq!(
            cleaned("<svg><text>a &gt; b</text></svg>"),
            "<svg><text>a &gt; b</text></svg>"
        );
    }
}
