//! HTTP response handlers.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::content::maybe_inject_reload;
use crate::embed::serve::{RELOAD_JS, ReloadVars};
use crate::utils::mime::{
    self,
    types::{HTML, JAVASCRIPT, PLAIN},
};

/// Respond with a static file, injecting the reload script into HTML.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = maybe_inject_reload(body, content_type);
    send_body(request, 200, content_type, body)
}

/// Respond with `404.html` from the output root, or a plain 404.
pub fn respond_not_found(request: Request, serve_root: &Path) -> Result<()> {
    let custom_404 = serve_root.join("404.html");
    let has_custom = custom_404.is_file();

    if is_head_request(&request) {
        let mime = if has_custom { HTML } else { PLAIN };
        return send_head(request, 404, mime);
    }

    if has_custom && let Ok(body) = fs::read(&custom_404) {
        let body = maybe_inject_reload(body, HTML);
        return send_body(request, 404, HTML, body);
    }

    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

/// Respond with reload.js from memory.
pub fn respond_reload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = RELOAD_JS.render(&ReloadVars { ws_port });
    send_body(request, 200, JAVASCRIPT, body.into_bytes())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_header() {
        let header = make_header("Content-Type", HTML).unwrap();
        assert!(header.field.equiv("content-type"));
        assert_eq!(header.value.as_str(), HTML);
    }
}
