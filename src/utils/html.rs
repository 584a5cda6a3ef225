//! HTML utility functions.
//!
//! - `escape_attr()` - attribute value escaping
//! - `prettify()` - markup reformatting for rendered pages
//!
//! `prettify` indents with one tab per level, keeps block elements on their
//! own lines and collapses runs of inline content. `<pre>`/`<textarea>`
//! bodies are kept verbatim and `<script>`/`<style>` bodies are re-indented
//! as a unit. Formatting is idempotent.

use std::borrow::Cow;

// =============================================================================
// HTML Escaping
// =============================================================================

/// Characters that require escaping inside a double-quoted attribute.
const ATTR_ESCAPE_CHARS: [char; 4] = ['<', '>', '&', '"'];

#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

/// Escape an attribute value for use inside double quotes.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(ATTR_ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

// =============================================================================
// Element Classification
// =============================================================================

/// Elements without closing tags.
#[inline]
fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
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

/// Elements laid out inline with surrounding text.
#[inline]
fn is_inline_element(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr"
            | "acronym"
            | "area"
            | "audio"
            | "b"
            | "bdi"
            | "bdo"
            | "big"
            | "br"
            | "button"
            | "canvas"
            | "cite"
            | "code"
            | "data"
            | "datalist"
            | "del"
            | "dfn"
            | "em"
            | "embed"
            | "i"
            | "iframe"
            | "img"
            | "input"
            | "ins"
            | "kbd"
            | "label"
            | "map"
            | "mark"
            | "math"
            | "meter"
            | "noscript"
            | "object"
            | "output"
            | "progress"
            | "q"
            | "ruby"
            | "s"
            | "samp"
            | "select"
            | "small"
            | "span"
            | "strike"
            | "strong"
            | "sub"
            | "sup"
            | "svg"
            | "template"
            | "textarea"
            | "time"
            | "tt"
            | "u"
            | "var"
            | "video"
            | "wbr"
    )
}

/// Elements whose body is not markup.
#[inline]
fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "pre" | "textarea")
}

/// Raw elements whose body is printed byte-for-byte.
#[inline]
fn is_verbatim_element(tag: &str) -> bool {
    matches!(tag, "pre" | "textarea")
}

// =============================================================================
// Prettify
// =============================================================================

/// Markup tree used by the formatter.
#[derive(Debug)]
enum Markup {
    Text(String),
    /// Comment, doctype, processing instruction or CDATA, printed verbatim.
    Opaque(String),
    Element(MarkupElement),
}

#[derive(Debug)]
struct MarkupElement {
    /// Lower-cased tag name used for classification.
    name: String,
    /// Opening tag exactly as written.
    open: String,
    children: Vec<Markup>,
    /// Body of raw-text elements.
    raw: Option<String>,
    /// Closing tag as written, `None` for void or unclosed elements.
    close: Option<String>,
}

/// Reformat an HTML document.
pub fn prettify(html: &str) -> String {
    let tree = parse_markup(html);
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    write_block_children(&tree, 0, &mut out);
    out
}

// -----------------------------------------------------------------------------
// Parsing
// -----------------------------------------------------------------------------

fn parse_markup(html: &str) -> Vec<Markup> {
    // Open elements with their children so far; `root` holds top-level nodes.
    let mut stack: Vec<(MarkupElement, Vec<Markup>)> = Vec::new();
    let mut root: Vec<Markup> = Vec::new();
    let mut pos = 0;

    fn push(stack: &mut [(MarkupElement, Vec<Markup>)], root: &mut Vec<Markup>, node: Markup) {
        match stack.last_mut() {
            Some((_, children)) => children.push(node),
            None => root.push(node),
        }
    }

    fn close_top(stack: &mut Vec<(MarkupElement, Vec<Markup>)>, root: &mut Vec<Markup>) {
        if let Some((mut element, children)) = stack.pop() {
            element.children = children;
            push(stack, root, Markup::Element(element));
        }
    }

    while pos < html.len() {
        let rest = &html[pos..];

        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body.find("-->").map_or(rest.len(), |i| i + 4 + 3);
            push(&mut stack, &mut root, Markup::Opaque(rest[..end].to_string()));
            pos += end;
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = if rest.starts_with("<![CDATA[") {
                rest.find("]]>").map_or(rest.len(), |i| i + 3)
            } else {
                rest.find('>').map_or(rest.len(), |i| i + 1)
            };
            push(&mut stack, &mut root, Markup::Opaque(rest[..end].to_string()));
            pos += end;
            continue;
        }

        if let Some(after) = rest.strip_prefix("</")
            && after.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            let end = rest.find('>').map_or(rest.len(), |i| i + 1);
            let name = tag_name(after).to_ascii_lowercase();
            let close = rest[..end].to_string();
            pos += end;

            if let Some(index) = stack.iter().rposition(|(el, _)| el.name == name) {
                while stack.len() > index + 1 {
                    close_top(&mut stack, &mut root);
                }
                if let Some((element, _)) = stack.last_mut() {
                    element.close = Some(close);
                }
                close_top(&mut stack, &mut root);
            }
            continue;
        }

        if let Some(after) = rest.strip_prefix('<')
            && after.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            let end = find_tag_end(rest);
            let open = &rest[..end];
            let name = tag_name(after).to_ascii_lowercase();
            pos += end;

            let mut element = MarkupElement {
                name,
                open: open.to_string(),
                children: Vec::new(),
                raw: None,
                close: None,
            };

            if is_void_element(&element.name) || open.ends_with("/>") {
                push(&mut stack, &mut root, Markup::Element(element));
            } else if is_raw_text_element(&element.name) {
                let body = &html[pos..];
                let (raw_len, close) = find_raw_close(body, &element.name);
                element.raw = Some(body[..raw_len].to_string());
                element.close = close.map(|c| body[raw_len..raw_len + c].to_string());
                pos += raw_len + close.unwrap_or(0);
                push(&mut stack, &mut root, Markup::Element(element));
            } else {
                stack.push((element, Vec::new()));
            }
            continue;
        }

        // Text up to the next tag-like `<`.
        let end = rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '<')
            .map_or(rest.len(), |(i, _)| i);
        push(&mut stack, &mut root, Markup::Text(rest[..end].to_string()));
        pos += end;
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut root);
    }
    root
}

/// Tag name at the start of `s` (after `<` or `</`).
fn tag_name(s: &str) -> &str {
    let end = s
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(s.len());
    &s[..end]
}

/// Byte offset just past the `>` ending the tag at `s[0]`, honoring quotes.
fn find_tag_end(s: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => {}
        }
    }
    s.len()
}

/// Locate `</name>` (case-insensitive) in a raw-text body.
///
/// Returns the body length and the closing tag length, if found.
fn find_raw_close(body: &str, name: &str) -> (usize, Option<usize>) {
    let lower = body.to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let start = from + found;
        let after = &lower[start + needle.len()..];
        if after.starts_with(|c: char| c == '>' || c.is_whitespace()) {
            let close_len = after.find('>').map_or(after.len(), |i| i + 1) + needle.len();
            return (start, Some(close_len));
        }
        from = start + needle.len();
    }
    (body.len(), None)
}

// -----------------------------------------------------------------------------
// Printing
// -----------------------------------------------------------------------------

fn indent(depth: usize, out: &mut String) {
    out.extend(std::iter::repeat_n('\t', depth));
}

/// Whether a node can be laid out inside a line of text.
fn is_inline(node: &Markup) -> bool {
    match node {
        Markup::Text(_) => true,
        Markup::Opaque(_) => false,
        Markup::Element(el) => {
            is_inline_element(&el.name)
                && (el.raw.is_none() || is_verbatim_element(&el.name))
                && el.children.iter().all(is_inline)
        }
    }
}

fn is_whitespace_text(node: &Markup) -> bool {
    matches!(node, Markup::Text(text) if text.trim().is_empty())
}

/// Print children one per line at `depth`, grouping inline runs.
fn write_block_children(children: &[Markup], depth: usize, out: &mut String) {
    let mut printed = false;
    let mut blank_pending = false;
    let mut run: Vec<&Markup> = Vec::new();

    let flush_run = |run: &mut Vec<&Markup>, printed: &mut bool, blank: &mut bool, out: &mut String| {
        let mut line = String::new();
        for node in run.drain(..) {
            write_inline(node, &mut line);
        }
        let line = line.trim();
        if !line.is_empty() {
            if *printed && *blank {
                out.push('\n');
            }
            indent(depth, out);
            out.push_str(line);
            out.push('\n');
            *printed = true;
            *blank = false;
        }
    };

    for node in children {
        if is_whitespace_text(node) {
            if let Markup::Text(text) = node
                && text.matches('\n').count() >= 2
                && run.iter().all(|n| is_whitespace_text(n))
            {
                blank_pending = true;
            }
            run.push(node);
            continue;
        }

        if is_inline(node) {
            run.push(node);
            continue;
        }

        flush_run(&mut run, &mut printed, &mut blank_pending, out);
        if printed && blank_pending {
            out.push('\n');
        }
        write_block(node, depth, out);
        printed = true;
        blank_pending = false;
    }

    flush_run(&mut run, &mut printed, &mut blank_pending, out);
}

/// Print a node that occupies its own line(s).
fn write_block(node: &Markup, depth: usize, out: &mut String) {
    let element = match node {
        Markup::Element(element) => element,
        Markup::Opaque(text) | Markup::Text(text) => {
            indent(depth, out);
            out.push_str(text.trim());
            out.push('\n');
            return;
        }
    };

    indent(depth, out);
    out.push_str(&element.open);

    if let Some(raw) = &element.raw {
        if is_verbatim_element(&element.name) {
            out.push_str(raw);
        } else {
            write_reindented(raw, depth + 1, out);
            if !raw.trim().is_empty() && element.close.is_some() {
                indent(depth, out);
            }
        }
    } else if element.children.iter().all(is_inline) {
        let mut line = String::new();
        for child in &element.children {
            write_inline(child, &mut line);
        }
        out.push_str(line.trim());
    } else {
        out.push('\n');
        write_block_children(&element.children, depth + 1, out);
        if let Some(close) = &element.close {
            indent(depth, out);
            out.push_str(close);
            out.push('\n');
        }
        return;
    }

    if let Some(close) = &element.close {
        out.push_str(close);
    }
    out.push('\n');
}

/// Print a script/style body on its own lines, shifted to `depth`.
fn write_reindented(raw: &str, depth: usize, out: &mut String) {
    let lines: Vec<&str> = raw.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return;
    };
    let body = &lines[first..=last];

    // Only ASCII indentation is shifted; other whitespace is content.
    let common = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    out.push('\n');
    for line in body {
        let line = line.trim_end();
        if !line.is_empty() {
            indent(depth, out);
            out.push_str(&line[common..]);
        }
        out.push('\n');
    }
}

/// Append a node to a line of inline content, collapsing whitespace.
fn write_inline(node: &Markup, line: &mut String) {
    match node {
        Markup::Text(text) => push_collapsed(text, line),
        Markup::Opaque(text) => line.push_str(text),
        Markup::Element(element) => {
            line.push_str(&element.open);
            if let Some(raw) = &element.raw {
                line.push_str(raw);
            }
            for child in &element.children {
                write_inline(child, line);
            }
            if let Some(close) = &element.close {
                line.push_str(close);
            }
        }
    }
}

fn push_collapsed(text: &str, line: &mut String) {
    let mut in_space = line.ends_with(' ');
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                line.push(' ');
                in_space = true;
            }
        } else {
            line.push(c);
            in_space = false;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("normal"), "normal");
        assert_eq!(escape_attr("a\"b&c"), "a&quot;b&amp;c");
        assert_eq!(escape_attr("<it's>"), "&lt;it's&gt;");
        assert!(matches!(escape_attr("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_prettify_document() {
        let html = "<!DOCTYPE html><html><head><title>Home</title><link rel=\"stylesheet\" href=\"/css/main.min.css\"></head><body><div class=\"wrap\"><p>Hi <em>there</em></p><ul><li>a</li><li>b</li></ul></div></body></html>";
        let expected = "<!DOCTYPE html>\n<html>\n\t<head>\n\t\t<title>Home</title>\n\t\t<link rel=\"stylesheet\" href=\"/css/main.min.css\">\n\t</head>\n\t<body>\n\t\t<div class=\"wrap\">\n\t\t\t<p>Hi <em>there</em></p>\n\t\t\t<ul>\n\t\t\t\t<li>a</li>\n\t\t\t\t<li>b</li>\n\t\t\t</ul>\n\t\t</div>\n\t</body>\n</html>\n";
        assert_eq!(prettify(html), expected);
    }

    #[test]
    fn test_prettify_single_paragraph() {
        assert_eq!(prettify("<p>Hi</p>"), "<p>Hi</p>\n");
    }

    #[test]
    fn test_prettify_collapses_inline_whitespace() {
        assert_eq!(
            prettify("<p>\n   one\n   <a href=\"#\">two</a>   three\n</p>"),
            "<p>one <a href=\"#\">two</a> three</p>\n"
        );
    }

    #[test]
    fn test_prettify_pre_verbatim() {
        let html = "<div><pre>  a\n    b</pre></div>";
        assert_eq!(prettify(html), "<div>\n\t<pre>  a\n    b</pre>\n</div>\n");
    }

    #[test]
    fn test_prettify_reindents_script() {
        let html = "<body><script>\n    if (a) {\n        go();\n    }\n</script></body>";
        assert_eq!(
            prettify(html),
            "<body>\n\t<script>\n\t\tif (a) {\n\t\t    go();\n\t\t}\n\t</script>\n</body>\n"
        );
    }

    #[test]
    fn test_prettify_script_with_unicode_whitespace() {
        let html = "<script>\n  \u{3000}var a = 1;\n    var b = 2;\n</script>";
        let once = prettify(html);
        assert_eq!(
            once,
            "<script>\n\t\u{3000}var a = 1;\n\t  var b = 2;\n</script>\n"
        );
        assert_eq!(prettify(&once), once);
    }

    #[test]
    fn test_prettify_empty_script_on_one_line() {
        assert_eq!(
            prettify("<head><script src=\"/a.js\"></script></head>"),
            "<head>\n\t<script src=\"/a.js\"></script>\n</head>\n"
        );
    }

    #[test]
    fn test_prettify_keeps_one_blank_line() {
        let html = "<div>\n<p>a</p>\n\n\n\n<p>b</p>\n</div>";
        assert_eq!(prettify(html), "<div>\n\t<p>a</p>\n\n\t<p>b</p>\n</div>\n");
    }

    #[test]
    fn test_prettify_mixed_content() {
        assert_eq!(
            prettify("<div>intro<p>x</p>outro</div>"),
            "<div>\n\tintro\n\t<p>x</p>\n\toutro\n</div>\n"
        );
    }

    #[test]
    fn test_prettify_comment_on_own_line() {
        assert_eq!(
            prettify("<div><!-- note --><p>x</p></div>"),
            "<div>\n\t<!-- note -->\n\t<p>x</p>\n</div>\n"
        );
    }

    #[test]
    fn test_prettify_is_idempotent() {
        for html in [
            "<!DOCTYPE html><html><head><title>T</title><style>\nbody { margin: 0 }\n</style></head><body><h1>T</h1><p>a <b>b</b>\n c</p>\n\n<div><pre>\n x\n</pre><textarea> keep  this </textarea></div><script>var a = 1;</script></body></html>",
            "<div>intro<p>x</p>outro</div>",
            "<ul><li><a href=\"/\">Home</a></li><li><div>block</div></li></ul>",
        ] {
            let once = prettify(html);
            assert_eq!(prettify(&once), once, "not idempotent for {html}");
        }
    }

    #[test]
    fn test_prettify_unclosed_elements() {
        assert_eq!(
            prettify("<div><p>a<p>b</div>"),
            "<div>\n\t<p>\n\t\ta\n\t\t<p>b\n</div>\n"
        );
    }
}
