//! Content processing utilities.

use crate::embed::serve::RELOAD_SCRIPT_TAG;
use crate::utils::mime;

/// Inject the live-reload script into HTML bodies.
pub fn maybe_inject_reload(body: Vec<u8>, content_type: &str) -> Vec<u8> {
    if mime::is_html(content_type) {
        inject_reload_script(&body)
    } else {
        body
    }
}

/// Inject the live-reload script before `</body>` tag
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let script_bytes = RELOAD_SCRIPT_TAG.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    if let Some(pos) = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        result.extend_from_slice(&content[..pos]);
        result.extend_from_slice(script_bytes);
        result.extend_from_slice(&content[pos..]);
        return result;
    }

    // No </body> found, append to end
    result.extend_from_slice(content);
    result.extend_from_slice(script_bytes);
    result
}
