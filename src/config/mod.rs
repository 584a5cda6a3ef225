//! Pipeline configuration management for `sitepipe.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section.rs   # [paths], [styles], [serve], [watch]
//! ├── error.rs     # ConfigError
//! ├── handle.rs    # Global config handle (arc-swap)
//! ├── util.rs      # Config file discovery
//! └── mod.rs       # PipelineConfig (this file)
//! ```
//!
//! The config file is optional: without it every section uses its defaults
//! and the working directory is the project root.

mod error;
mod handle;
pub mod section;
mod util;

pub use error::ConfigError;
pub use handle::{cfg, init_config};
pub use section::{PathsConfig, ServeConfig, StylesConfig, WatchConfig};

use crate::cli::{Cli, Commands};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

/// Name of the stylesheet/script suffix inserted before the extension.
pub const MIN_SUFFIX: &str = ".min";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing sitepipe.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Source, output and cache directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Stylesheet entry and browser targets
    #[serde(default)]
    pub styles: StylesConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Watch loop settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl PipelineConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. When none is found the
    /// defaults apply and cwd becomes the project root.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(&cli.config) {
            Some(path) => {
                let config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                (config, root)
            }
            None => (Self::default(), cwd),
        };

        config.apply_cli_options(cli);
        config.finalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Build a default configuration rooted at `root`.
    pub fn for_root(root: &Path) -> Self {
        let mut config = Self::default();
        config.finalize(root);
        config
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored: {}", display_path, fields.join(", "));
    }

    /// Apply command-line overrides.
    fn apply_cli_options(&mut self, cli: &Cli) {
        if let Some(source) = &cli.source {
            self.paths.source = source.clone();
        }
        if let Some(output) = &cli.output {
            self.paths.output = output.clone();
        }
        if let Some(Commands::Serve { interface, port }) = &cli.command {
            if let Some(interface) = interface {
                self.serve.interface = *interface;
            }
            if let Some(port) = port {
                self.serve.port = *port;
            }
        }
    }

    /// Resolve every configured path against the project root.
    fn finalize(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.paths.source = root.join(&self.paths.source);
        self.paths.output = root.join(&self.paths.output);
        self.paths.cache = root.join(&self.paths.cache);
    }

    /// Reject configurations that would make tasks overwrite their inputs.
    pub fn validate(&self) -> Result<()> {
        let paths = &self.paths;
        if paths.source == paths.output {
            return Err(ConfigError::Validation(
                "paths.source and paths.output must be different directories".into(),
            )
            .into());
        }
        if paths.source.starts_with(&paths.output) {
            return Err(ConfigError::Validation(format!(
                "paths.source `{}` must not live inside paths.output",
                paths.source.display()
            ))
            .into());
        }
        if self.styles.browsers.is_empty() {
            return Err(ConfigError::Validation("styles.browsers must not be empty".into()).into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // path helpers
    // ------------------------------------------------------------------------

    /// Source tree root (`app/`).
    pub fn source_dir(&self) -> &Path {
        &self.paths.source
    }

    /// Output tree root (`dist/`).
    pub fn output_dir(&self) -> &Path {
        &self.paths.output
    }

    /// Persistent cache root.
    pub fn cache_dir(&self) -> &Path {
        &self.paths.cache
    }

    /// Join a path onto the source tree.
    pub fn source_join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.paths.source.join(rel)
    }

    /// Join a path onto the output tree.
    pub fn output_join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.paths.output.join(rel)
    }

    /// Display a path relative to the project root.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Parse a config snippet for tests, asserting every field is known.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    let (parsed, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(PipelineConfig::parse_with_ignored("[paths\nsource = 1").is_err());
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sitepipe.toml");
        fs::write(&path, "[paths]\noutput = \"public\"\n").unwrap();

        let config = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(config.paths.output, PathBuf::from("public"));
        assert!(PipelineConfig::from_path(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_empty_config_uses_layout_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.paths.source, PathBuf::from("app"));
        assert_eq!(config.paths.output, PathBuf::from("dist"));
        assert_eq!(config.paths.cache, PathBuf::from(".sitepipe/cache"));
    }

    #[test]
    fn test_unknown_fields_are_collected() {
        let (_, ignored) =
            PipelineConfig::parse_with_ignored("[paths]\nsource = \"src\"\nbogus = 1").unwrap();
        assert_eq!(ignored, vec!["paths.bogus".to_string()]);
    }

    #[test]
    fn test_for_root_resolves_paths() {
        let config = PipelineConfig::for_root(Path::new("/site"));
        assert_eq!(config.source_dir(), Path::new("/site/app"));
        assert_eq!(config.output_dir(), Path::new("/site/dist"));
        assert_eq!(config.cache_dir(), Path::new("/site/.sitepipe/cache"));
        assert_eq!(config.source_join("pages"), PathBuf::from("/site/app/pages"));
    }

    #[test]
    fn test_validate_rejects_same_source_and_output() {
        let mut config = test_parse_config("[paths]\nsource = \"web\"\noutput = \"web\"");
        config.finalize(Path::new("/site"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_source_inside_output() {
        let mut config = test_parse_config("[paths]\nsource = \"dist/app\"");
        config.finalize(Path::new("/site"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let config = PipelineConfig::for_root(Path::new("/site"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_display_path_strips_root() {
        let config = PipelineConfig::for_root(Path::new("/site"));
        assert_eq!(
            config.display_path(Path::new("/site/dist/index.html")),
            "dist/index.html"
        );
        assert_eq!(config.display_path(Path::new("/elsewhere/x")), "/elsewhere/x");
    }
}
