//! SVG sprite assembly.
//!
//! Each icon is parsed, cleaned and wrapped in a `<symbol>` whose id is the
//! icon's file stem. Symbols are bundled under a hidden root `<svg>` that
//! pages reference with `<use xlink:href="sprite.svg#id">`.

mod clean;
mod tree;

use thiserror::Error;

use tree::SvgElement;

const SPRITE_OPEN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" style="display: none">"#;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("{0}")]
    Parse(String),
    #[error("root element is <{0}>, expected <svg>")]
    NotSvg(String),
}

/// Symbol id for an icon file stem: whitespace becomes `-`.
pub fn symbol_id(stem: &str) -> String {
    stem.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Turn one icon document into a `<symbol>` element.
pub fn symbol(id: &str, source: &str) -> Result<String, SpriteError> {
    let mut root = tree::parse(source)?;
    clean::minify(&mut root);
    clean::strip_presentation(&mut root);

    let mut symbol = SvgElement::new("symbol");
    symbol.attrs.push(("id".to_string(), id.to_string()));
    if let Some(view_box) = view_box(&root) {
        symbol.attrs.push(("viewBox".to_string(), view_box));
    }
    if let Some(aspect) = root.attr("preserveAspectRatio") {
        symbol
            .attrs
            .push(("preserveAspectRatio".to_string(), aspect.to_string()));
    }
    symbol.children = root.children;

    let mut out = String::new();
    tree::write(&symbol, &mut out);
    Ok(out)
}

/// Bundle symbols under the hidden sprite root.
pub fn assemble<S: AsRef<str>>(symbols: &[S]) -> String {
    let mut out = String::from(SPRITE_OPEN);
    for symbol in symbols {
        out.push_str(symbol.as_ref());
    }
    out.push_str("</svg>");
    out.replace("&gt;", ">")
}

/// The icon's `viewBox`, or one derived from `width`/`height`.
fn view_box(root: &SvgElement) -> Option<String> {
    if let Some(view_box) = root.attr("viewBox") {
        return Some(view_box.to_string());
    }
    let width = dimension(root.attr("width")?)?;
    let height = dimension(root.attr("height")?)?;
    Some(format!("0 0 {width} {height}"))
}

fn dimension(value: &str) -> Option<&str> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value).trim();
    value.parse::<f64>().ok().map(|_| value)
}
