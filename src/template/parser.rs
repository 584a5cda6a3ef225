//! Indentation-based parser producing the template syntax tree.

use std::sync::LazyLock;

use regex::Regex;

use super::lexer::{Line, split_lines};
use super::node::{Attr, AttrValue, Block, BlockMode, Element, Node};

/// Parse error: line number and message.
pub(super) type ParseError = (usize, String);

type Result<T> = std::result::Result<T, ParseError>;

/// Tag name followed by `.class` / `#id` shorthands.
static TAG_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*(?::[A-Za-z0-9_-]+)*)?((?:[.#][A-Za-z0-9_-]+)*)")
        .expect("valid tag regex")
});

/// Keywords that need a JavaScript runtime.
const CODE_KEYWORDS: &[&str] = &[
    "mixin", "if", "else", "unless", "each", "for", "while", "case", "when", "default", "yield",
];

/// Parse template source into nodes.
pub(super) fn parse(source: &str) -> Result<Vec<Node>> {
    let lines = split_lines(source)?;
    let indent_char = if source.lines().any(|l| l.starts_with('\t')) {
        '\t'
    } else {
        ' '
    };
    let mut parser = Parser {
        lines,
        pos: 0,
        indent_char,
    };
    parser.parse_children(None)
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    /// Indentation character of the file (the lexer rejects mixing).
    indent_char: char,
}

impl<'a> Parser<'a> {
    /// Parse consecutive statements indented deeper than `parent_indent`.
    fn parse_children(&mut self, parent_indent: Option<usize>) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut level: Option<usize> = None;

        while let Some(line) = self.next_significant() {
            if parent_indent.is_some_and(|parent| line.indent <= parent) {
                break;
            }
            match level {
                None => level = Some(line.indent),
                Some(level) if line.indent != level => {
                    return Err((line.number, "unexpected indentation".into()));
                }
                Some(_) => {}
            }

            self.pos += 1;
            if let Some(node) = self.parse_statement(line)? {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    /// Peek the next non-blank line, skipping blanks.
    fn next_significant(&mut self) -> Option<Line<'a>> {
        while let Some(line) = self.lines.get(self.pos) {
            if !line.is_blank() {
                return Some(*line);
            }
            self.pos += 1;
        }
        None
    }

    /// Consume every line nested under `indent` (blank lines included) and
    /// return them with the common indentation removed.
    fn take_nested_text(&mut self, indent: usize) -> Vec<String> {
        let start = self.pos;
        while let Some(line) = self.lines.get(self.pos) {
            if !line.is_blank() && line.indent <= indent {
                break;
            }
            self.pos += 1;
        }

        let mut block = &self.lines[start..self.pos];
        while block.last().is_some_and(Line::is_blank) {
            block = &block[..block.len() - 1];
        }

        let base = block
            .iter()
            .filter(|l| !l.is_blank())
            .map(|l| l.indent)
            .min()
            .unwrap_or(0);

        block
            .iter()
            .map(|l| {
                if l.is_blank() {
                    String::new()
                } else {
                    let pad = self.indent_char.to_string().repeat(l.indent - base);
                    format!("{pad}{}", l.text)
                }
            })
            .collect()
    }

    fn parse_statement(&mut self, line: Line<'a>) -> Result<Option<Node>> {
        let text = line.text;

        if text.starts_with("//-") {
            self.take_nested_text(line.indent);
            return Ok(None);
        }

        if let Some(rest) = text.strip_prefix("//") {
            let nested = self.take_nested_text(line.indent);
            let body = if nested.is_empty() {
                rest.to_string()
            } else {
                format!("{rest}\n{}\n", nested.join("\n"))
            };
            return Ok(Some(Node::Comment(body)));
        }

        if let Some(rest) = text.strip_prefix('|') {
            self.reject_nested(line)?;
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            check_text(rest, line.number)?;
            return Ok(Some(Node::Text(rest.to_string())));
        }

        if text.starts_with('<') {
            let mut nodes = vec![Node::Text(text.to_string())];
            nodes.extend(self.parse_children(Some(line.indent))?);
            return Ok(Some(if nodes.len() == 1 {
                nodes.remove(0)
            } else {
                Node::Fragment(nodes)
            }));
        }

        let (keyword, argument) = split_keyword(text);
        match keyword {
            "doctype" => {
                self.reject_nested(line)?;
                let value = if argument.is_empty() { "html" } else { argument };
                return Ok(Some(Node::Doctype(value.to_string())));
            }
            "include" => {
                self.reject_nested(line)?;
                let path = require_argument("include", argument, line.number)?;
                return Ok(Some(Node::Include {
                    path,
                    line: line.number,
                }));
            }
            "extends" => {
                self.reject_nested(line)?;
                let path = require_argument("extends", argument, line.number)?;
                return Ok(Some(Node::Extends {
                    path,
                    line: line.number,
                }));
            }
            "block" | "append" | "prepend" => {
                return self.parse_block(keyword, argument, line).map(Some);
            }
            _ => {}
        }

        if CODE_KEYWORDS.contains(&keyword) {
            return Err(unsupported(line.number, &format!("`{keyword}`")));
        }
        if text.starts_with('-') || text.starts_with('=') || text.starts_with("!=") {
            return Err(unsupported(line.number, "unbuffered or buffered code"));
        }
        if text.starts_with('+') {
            return Err(unsupported(line.number, "mixin calls"));
        }
        if text.starts_with(':') {
            return Err(unsupported(line.number, "filters"));
        }

        self.parse_tag_statement(line).map(|el| Some(Node::Element(el)))
    }

    fn parse_block(&mut self, keyword: &str, argument: &str, line: Line<'a>) -> Result<Node> {
        let (mode, name) = match keyword {
            "append" => (BlockMode::Append, argument),
            "prepend" => (BlockMode::Prepend, argument),
            _ => match split_keyword(argument) {
                ("append", name) => (BlockMode::Append, name),
                ("prepend", name) => (BlockMode::Prepend, name),
                _ => (BlockMode::Replace, argument),
            },
        };
        let name = require_argument(keyword, name, line.number)?;
        let children = self.parse_children(Some(line.indent))?;
        Ok(Node::Block(Block {
            name,
            mode,
            children,
        }))
    }

    /// Parse a tag line, joining continuation lines of a multi-line
    /// attribute list, then attach nested children.
    fn parse_tag_statement(&mut self, line: Line<'a>) -> Result<Element> {
        let mut text = line.text.to_string();
        while !attributes_closed(&text) {
            let Some(next) = self.lines.get(self.pos) else {
                return Err((line.number, "unterminated attribute list".into()));
            };
            text.push(' ');
            text.push_str(next.text);
            self.pos += 1;
        }

        let (mut element, tail) = parse_tag(&text, line.number)?;
        let nested = match tail {
            Tail::None => self.parse_children(Some(line.indent))?,
            Tail::TextBlock => {
                let lines = self.take_nested_text(line.indent);
                if lines.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::Text(lines.join("\n"))]
                }
            }
        };
        attach(&mut element, nested, line.number)?;
        Ok(element)
    }

    /// Fail if a leaf statement has indented lines below it.
    fn reject_nested(&self, line: Line<'a>) -> Result<()> {
        let nested = self.lines[self.pos..]
            .iter()
            .find(|l| !l.is_blank())
            .is_some_and(|l| l.indent > line.indent);
        if nested {
            Err((line.number, "this line cannot have nested content".into()))
        } else {
            Ok(())
        }
    }
}

/// What follows the inline part of a tag line.
enum Tail {
    /// Nested lines are child statements.
    None,
    /// `tag.`: nested lines are raw text.
    TextBlock,
}

/// Parse one tag line (possibly with `: ` block expansion).
fn parse_tag(text: &str, number: usize) -> Result<(Element, Tail)> {
    let caps = TAG_HEAD
        .captures(text)
        .ok_or_else(|| (number, format!("unexpected text `{text}`")))?;
    let name = caps.get(1).map(|m| m.as_str());
    let shorthand = caps.get(2).map_or("", |m| m.as_str());
    let head_len = caps.get(0).map_or(0, |m| m.end());

    if name.is_none() && shorthand.is_empty() {
        return Err((number, format!("unexpected text `{text}`")));
    }

    let mut element = Element::new(name.unwrap_or("div"));
    let mut classes = Vec::new();
    for part in split_shorthand(shorthand) {
        if let Some(class) = part.strip_prefix('.') {
            classes.push(class.to_string());
        } else if let Some(id) = part.strip_prefix('#') {
            element.attrs.push(Attr {
                name: "id".into(),
                value: AttrValue::Str {
                    value: id.to_string(),
                    escape: true,
                },
            });
        }
    }

    let mut rest = &text[head_len..];
    if rest.starts_with('(') {
        let (attrs, consumed) = parse_attributes(rest, number)?;
        for attr in attrs {
            if attr.name == "class"
                && let AttrValue::Str { value, .. } = &attr.value
            {
                classes.extend(value.split_whitespace().map(str::to_string));
                continue;
            }
            element.attrs.retain(|a| a.name != attr.name);
            element.attrs.push(attr);
        }
        rest = &rest[consumed..];
    }

    if !classes.is_empty() {
        element.attrs.insert(
            0,
            Attr {
                name: "class".into(),
                value: AttrValue::Str {
                    value: classes.join(" "),
                    escape: true,
                },
            },
        );
    }

    if rest.starts_with("&attributes") {
        return Err(unsupported(number, "`&attributes`"));
    }
    if let Some(after) = rest.strip_prefix('/') {
        element.self_closing = true;
        rest = after;
    }

    if rest.is_empty() {
        return Ok((element, Tail::None));
    }
    if rest == "." {
        return Ok((element, Tail::TextBlock));
    }
    if let Some(expansion) = rest.strip_prefix(':') {
        let expansion = expansion.trim_start();
        if expansion.is_empty() {
            return Err((number, "expected a tag after `:`".into()));
        }
        let (child, tail) = parse_tag(expansion, number)?;
        element.children.push(Node::Element(child));
        return Ok((element, tail));
    }
    if rest.starts_with('=') || rest.starts_with("!=") {
        return Err(unsupported(number, "buffered code"));
    }
    if let Some(inline) = rest.strip_prefix(' ') {
        check_text(inline, number)?;
        if !inline.is_empty() && (is_void(&element.name) || element.self_closing) {
            return Err((
                number,
                format!("`{}` is self-closing and cannot have content", element.name),
            ));
        }
        if !inline.is_empty() {
            element.children.push(Node::Text(inline.to_string()));
        }
        return Ok((element, Tail::None));
    }

    Err((number, format!("unexpected `{rest}` after tag `{}`", element.name)))
}

/// Append nested lines to the innermost element of a block expansion
/// (`li: a` nests under `a`).
fn attach(element: &mut Element, nested: Vec<Node>, number: usize) -> Result<()> {
    if let [Node::Element(child)] = element.children.as_mut_slice() {
        return attach(child, nested, number);
    }
    if !nested.is_empty() && (is_void(&element.name) || element.self_closing) {
        return Err((
            number,
            format!("`{}` is self-closing and cannot have content", element.name),
        ));
    }
    element.children.extend(nested);
    Ok(())
}

/// Split `.a#b.c` into `[".a", "#b", ".c"]`.
fn split_shorthand(shorthand: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in shorthand.char_indices().skip(1) {
        if c == '.' || c == '#' {
            parts.push(&shorthand[start..i]);
            start = i;
        }
    }
    if start < shorthand.len() {
        parts.push(&shorthand[start..]);
    }
    parts
}

/// Check that a tag line's attribute list, if any, is closed.
fn attributes_closed(text: &str) -> bool {
    let head_len = TAG_HEAD.find(text).map_or(0, |m| m.end());
    let rest = &text[head_len..];
    if !rest.starts_with('(') {
        return true;
    }
    scan_attribute_end(rest).is_some()
}

/// Byte offset just past the `)` closing the attribute list at `rest[0]`.
fn scan_attribute_end(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse `(name="v", flag other='w')`, returning attributes and bytes consumed.
fn parse_attributes(rest: &str, number: usize) -> Result<(Vec<Attr>, usize)> {
    let end = scan_attribute_end(rest)
        .ok_or_else(|| (number, "unterminated attribute list".to_string()))?;
    let inner = &rest[1..end - 1];
    let mut chars = inner.char_indices().peekable();
    let mut attrs = Vec::new();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace() || *c == ',').is_some() {}
        let Some(&(start, _)) = chars.peek() else {
            break;
        };

        let mut name_end = inner.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == ',' || c == '=' || c == '!' {
                name_end = i;
                break;
            }
            chars.next();
        }
        let name = &inner[start..name_end];
        if name.is_empty() {
            return Err((number, "expected attribute name".into()));
        }

        while chars.next_if(|(_, c)| *c == ' ' || *c == '\t').is_some() {}

        let escape = match chars.peek() {
            Some((_, '!')) => {
                chars.next();
                if chars.next().map(|(_, c)| c) != Some('=') {
                    return Err((number, format!("expected `!=` after `{name}`")));
                }
                false
            }
            Some((_, '=')) => {
                chars.next();
                true
            }
            _ => {
                attrs.push(Attr {
                    name: name.to_string(),
                    value: AttrValue::Bool(true),
                });
                continue;
            }
        };

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let value = match chars.peek().map(|&(_, c)| c) {
            Some(q @ ('"' | '\'')) => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next().map(|(_, c)| c) {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other) => value.push(other),
                            None => break,
                        },
                        c if c == q => {
                            closed = true;
                            break;
                        }
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err((number, format!("unterminated string for `{name}`")));
                }
                AttrValue::Str { value, escape }
            }
            Some('`') => {
                return Err(unsupported(number, "template literal attributes"));
            }
            Some(_) => {
                let token_start = chars.peek().map_or(inner.len(), |&(i, _)| i);
                let mut token_end = inner.len();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || c == ',' {
                        token_end = i;
                        break;
                    }
                    chars.next();
                }
                let token = &inner[token_start..token_end];
                match token {
                    "true" => AttrValue::Bool(true),
                    "false" => AttrValue::Bool(false),
                    _ if token.parse::<f64>().is_ok() => AttrValue::Str {
                        value: token.to_string(),
                        escape,
                    },
                    _ => {
                        return Err((
                            number,
                            format!(
                                "attribute `{name}` uses the expression `{token}`; only literal values are supported"
                            ),
                        ));
                    }
                }
            }
            None => return Err((number, format!("expected a value for `{name}`"))),
        };

        while chars.next_if(|(_, c)| *c == ' ' || *c == '\t').is_some() {}
        if chars.peek().is_some_and(|&(_, c)| c == '+') {
            return Err(unsupported(number, "attribute expressions"));
        }

        attrs.push(Attr {
            name: name.to_string(),
            value,
        });
    }

    Ok((attrs, end))
}

/// Split `keyword rest` at the first space.
fn split_keyword(text: &str) -> (&str, &str) {
    match text.split_once(' ') {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (text, ""),
    }
}

fn require_argument(keyword: &str, argument: &str, number: usize) -> Result<String> {
    if argument.is_empty() {
        Err((number, format!("`{keyword}` needs an argument")))
    } else {
        Ok(argument.to_string())
    }
}

/// Reject interpolation, which needs a JavaScript runtime.
fn check_text(text: &str, number: usize) -> Result<()> {
    if text.contains("#{") || text.contains("!{") {
        Err(unsupported(number, "`#{}` interpolation"))
    } else if text.contains("#[") {
        Err(unsupported(number, "`#[]` tag interpolation"))
    } else {
        Ok(())
    }
}

fn unsupported(number: usize, what: &str) -> ParseError {
    (number, format!("{what} is not supported (templates must be static)"))
}

/// Elements without closing tags.
pub(super) fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}
