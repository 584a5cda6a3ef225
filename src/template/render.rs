//! HTML emission from a resolved node tree.

use super::node::{AttrValue, Element, Node};
use super::parser::is_void;
use crate::utils::html::escape_attr;

/// Render resolved nodes to HTML.
///
/// Terse mode (short boolean attributes, `<br>` instead of `<br/>`) applies
/// when the document declares `doctype html`.
pub(super) fn render(nodes: &[Node]) -> String {
    let terse = find_doctype(nodes).is_some_and(|doctype| doctype == "html");
    let mut out = String::new();
    Writer { out: &mut out, terse }.nodes(nodes);
    out
}

fn find_doctype(nodes: &[Node]) -> Option<&str> {
    nodes.iter().find_map(|node| match node {
        Node::Doctype(value) => Some(value.as_str()),
        Node::Fragment(children) => find_doctype(children),
        Node::Block(block) => find_doctype(&block.children),
        _ => None,
    })
}

/// Full doctype declaration for a `doctype` value.
fn doctype_declaration(value: &str) -> String {
    match value {
        "html" => "<!DOCTYPE html>".into(),
        "xml" => r#"<?xml version="1.0" encoding="utf-8" ?>"#.into(),
        "transitional" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#.into(),
        "strict" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#.into(),
        "frameset" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#.into(),
        "1.1" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#.into(),
        "basic" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML Basic 1.1//EN" "http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd">"#.into(),
        "mobile" => r#"<!DOCTYPE html PUBLIC "-//WAPFORUM//DTD XHTML Mobile 1.2//EN" "http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd">"#.into(),
        "plist" => r#"<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">"#.into(),
        custom => format!("<!DOCTYPE {custom}>"),
    }
}

struct Writer<'a> {
    out: &'a mut String,
    terse: bool,
}

impl Writer<'_> {
    fn nodes(&mut self, nodes: &[Node]) {
        // Adjacent text nodes (piped lines) are separated by a newline.
        let mut previous_text = false;
        for node in nodes {
            let is_text = matches!(node, Node::Text(_));
            if is_text && previous_text {
                self.out.push('\n');
            }
            self.node(node);
            previous_text = is_text;
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Doctype(value) => self.out.push_str(&doctype_declaration(value)),
            Node::Element(element) => self.element(element),
            Node::Text(text) => self.out.push_str(text),
            Node::Comment(text) => {
                self.out.push_str("<!--");
                self.out.push_str(text);
                self.out.push_str("-->");
            }
            Node::Fragment(children) => self.nodes(children),
            Node::Block(block) => self.nodes(&block.children),
            // Resolved by the loader; a stray one renders nothing.
            Node::Include { .. } | Node::Extends { .. } => {}
        }
    }

    fn element(&mut self, element: &Element) {
        self.out.push('<');
        self.out.push_str(&element.name);

        for attr in &element.attrs {
            match &attr.value {
                AttrValue::Bool(false) => {}
                AttrValue::Bool(true) => {
                    self.out.push(' ');
                    self.out.push_str(&attr.name);
                    if !self.terse {
                        self.out.push_str("=\"");
                        self.out.push_str(&attr.name);
                        self.out.push('"');
                    }
                }
                AttrValue::Str { value, escape } => {
                    self.out.push(' ');
                    self.out.push_str(&attr.name);
                    self.out.push_str("=\"");
                    if *escape {
                        self.out.push_str(&escape_attr(value));
                    } else {
                        self.out.push_str(value);
                    }
                    self.out.push('"');
                }
            }
        }

        if is_void(&element.name) || element.self_closing {
            self.out.push_str(if self.terse { ">" } else { "/>" });
            return;
        }

        self.out.push('>');
        self.nodes(&element.children);
        self.out.push_str("</");
        self.out.push_str(&element.name);
        self.out.push('>');
    }
}
