//! Configuration sections.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! source = "app"              # Source tree (pages, sass, scripts, img, svg)
//! output = "dist"             # Output tree served by the dev server
//! cache = ".sitepipe/cache"   # Persistent image-optimization cache
//!
//! [styles]
//! entry = "sass/main.sass"    # Relative to paths.source
//! browsers = ["last 10 versions"]
//!
//! [serve]
//! interface = "127.0.0.1"
//! port = 3000
//! reload_port = 35729
//!
//! [watch]
//! styles_delay_ms = 100       # Absorbs editor multi-save bursts
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `[paths]` section: directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source tree root.
    pub source: PathBuf,
    /// Output tree root.
    pub output: PathBuf,
    /// Cache root for persistent task state.
    pub cache: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: "app".into(),
            output: "dist".into(),
            cache: ".sitepipe/cache".into(),
        }
    }
}

/// `[styles]` section: stylesheet entry and vendor-prefix targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Entry stylesheet, relative to the source tree.
    pub entry: PathBuf,
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: "sass/main.sass".into(),
            browsers: vec!["last 10 versions".into()],
        }
    }
}

/// `[serve]` section: development server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,
    /// HTTP port number.
    pub port: u16,
    /// WebSocket port for live reload.
    pub reload_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            reload_port: 35729,
        }
    }
}

/// `[watch]` section: watch loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Delay before re-running the stylesheet task after a change.
    pub styles_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            styles_delay_ms: 100,
        }
    }
}

impl WatchConfig {
    pub fn styles_delay(&self) -> Duration {
        Duration::from_millis(self.styles_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.reload_port, 35729);
    }

    #[test]
    fn test_serve_config_partial_override() {
        let config = test_parse_config("[serve]\nport = 8080\ninterface = \"::1\"");
        assert_eq!(config.serve.port, 8080);
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
        assert_eq!(config.serve.reload_port, 35729);
    }

    #[test]
    fn test_styles_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.styles.entry, PathBuf::from("sass/main.sass"));
        assert_eq!(config.styles.browsers, vec!["last 10 versions".to_string()]);
    }

    #[test]
    fn test_styles_config_custom_browsers() {
        let config = test_parse_config("[styles]\nbrowsers = [\"> 1%\", \"not dead\"]");
        assert_eq!(config.styles.browsers.len(), 2);
        assert_eq!(config.styles.entry, PathBuf::from("sass/main.sass"));
    }

    #[test]
    fn test_watch_config_delay() {
        assert_eq!(
            test_parse_config("").watch.styles_delay(),
            Duration::from_millis(100)
        );
        assert_eq!(
            test_parse_config("[watch]\nstyles_delay_ms = 250")
                .watch
                .styles_delay(),
            Duration::from_millis(250)
        );
    }
}
