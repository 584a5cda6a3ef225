//! Minimal SVG element tree built from quick-xml events.
//!
//! Text and attribute values are kept exactly as written (still escaped),
//! so serialization never re-encodes entities. Comments, declarations,
//! processing instructions and doctypes are discarded while reading.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::SpriteError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum SvgNode {
    Element(SvgElement),
    /// Raw (escaped) character data.
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct SvgElement {
    pub name: String,
    /// Attribute names and raw values, in source order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<SvgNode>,
}

impl SvgElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(SvgNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(SvgNode::Text(text.to_string()));
        }
    }
}

/// Parse an SVG document into its root `<svg>` element.
pub(super) fn parse(source: &str) -> Result<SvgElement, SpriteError> {
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<SvgElement> = Vec::new();
    let mut root: Option<SvgElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            SpriteError::Parse(format!(
                "XML parse error at position {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(start) => stack.push(element(&start)?),
            Event::Empty(start) => {
                let el = element(&start)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| SpriteError::Parse("unexpected closing tag".into()))?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&String::from_utf8_lossy(&text));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&format!("&{};", String::from_utf8_lossy(&reference)));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(SvgNode::CData(String::from_utf8_lossy(&data).into_owned()));
                }
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(SpriteError::Parse(format!("unclosed <{}> element", open.name)));
    }
    let root = root.ok_or_else(|| SpriteError::Parse("no root element".into()))?;
    if root.name != "svg" {
        return Err(SpriteError::NotSvg(root.name));
    }
    Ok(root)
}

fn element(start: &BytesStart<'_>) -> Result<SvgElement, SpriteError> {
    let mut el = SvgElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SpriteError::Parse(e.to_string()))?;
        el.attrs.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(el)
}

/// Attach a finished element to its parent, or make it the root.
fn attach(
    stack: &mut [SvgElement],
    root: &mut Option<SvgElement>,
    el: SvgElement,
) -> Result<(), SpriteError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(SvgNode::Element(el)),
        None if root.is_none() => *root = Some(el),
        None => return Err(SpriteError::Parse("multiple root elements".into())),
    }
    Ok(())
}

/// Serialize an element and its subtree.
pub(super) fn write(el: &SvgElement, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        // Values from single-quoted attributes may hold bare double quotes.
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }

    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &el.children {
        match child {
            SvgNode::Element(child) => write(child, out),
            SvgNode::Text(text) => out.push_str(text),
            SvgNode::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(data);
                out.push_str("]]>");
            }
        }
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}
