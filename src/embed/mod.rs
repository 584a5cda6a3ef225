//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server resources (live-reload client)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_JS, ReloadVars};
//!
//! let js = RELOAD_JS.render(&ReloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the live-reload client is served from.
    pub const RELOAD_JS_URL: &str = "/__sitepipe/reload.js";

    /// Tag injected before `</body>` of served pages.
    pub const RELOAD_SCRIPT_TAG: &str = r#"<script src="/__sitepipe/reload.js" defer></script>"#;

    /// Variables for reload.js.
    pub struct ReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for ReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__SITEPIPE_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client, minified by the build script.
    pub const RELOAD_JS: Template<ReloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/reload.min.js")));
}
