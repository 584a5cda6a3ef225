//! MIME type detection for files served from the output tree.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const SOURCE_MAP: &str = "application/json";

    pub const OCTET_STREAM: &str = "application/octet-stream";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";
}

/// Guess MIME type from file extension.
///
/// Returns a full MIME type string suitable for the `Content-Type` header.
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    from_extension(ext.as_deref())
}

fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("map") => types::SOURCE_MAP,
        Some("xml") => types::XML,
        Some("txt") => types::PLAIN,

        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("ico") => types::ICO,

        Some("mp4" | "m4v") => types::MP4,
        Some("webm") => types::WEBM,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,
        Some("otf") => types::OTF,
        Some("eot") => types::EOT,

        _ => types::OCTET_STREAM,
    }
}

/// Whether a response with this MIME type gets the reload client injected.
pub fn is_html(mime: &str) -> bool {
    mime == types::HTML
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(Path::new("index.html")), types::HTML);
        assert_eq!(from_path(Path::new("css/main.min.css")), types::CSS);
        assert_eq!(from_path(Path::new("scripts/app.min.js")), types::JAVASCRIPT);
        assert_eq!(from_path(Path::new("img/logo.PNG")), types::PNG);
        assert_eq!(from_path(Path::new("img/photo.jpeg")), types::JPEG);
        assert_eq!(from_path(Path::new("svg/sprite.svg")), types::SVG);
        assert_eq!(from_path(Path::new("fonts/a.woff2")), types::WOFF2);
        assert_eq!(from_path(Path::new("unknown.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(Path::new("README")), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(types::HTML));
        assert!(!is_html(types::CSS));
    }
}
