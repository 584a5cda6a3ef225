//! Template syntax tree.

/// A node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Node {
    /// `doctype <value>`
    Doctype(String),
    /// A tag with attributes and children.
    Element(Element),
    /// Plain text or literal HTML, emitted unescaped.
    Text(String),
    /// Buffered comment, emitted as `<!--text-->`.
    Comment(String),
    /// Sequence of nodes without a wrapper (literal HTML with nested lines,
    /// resolved includes).
    Fragment(Vec<Node>),
    /// `include <path>`, replaced by the loader.
    Include { path: String, line: usize },
    /// `extends <path>`, consumed by the loader.
    Extends { path: String, line: usize },
    /// Named block (layout slot or override).
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Element {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    /// Written as `tag/`.
    pub self_closing: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Attr {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum AttrValue {
    /// String value; `escape` is false for `!=` assignments.
    Str { value: String, escape: bool },
    /// `flag`, `flag=true` or `flag=false`.
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockMode {
    Replace,
    Append,
    Prepend,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Block {
    pub name: String,
    pub mode: BlockMode,
    pub children: Vec<Node>,
}
