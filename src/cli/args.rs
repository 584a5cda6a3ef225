//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Task;

/// sitepipe static-site asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: sitepipe.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "sitepipe.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Source directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build everything, serve the output tree and rebuild on changes
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run every build task once without serving
    #[command(visible_alias = "b")]
    Build,

    /// Render pug pages into the output tree
    Pages,

    /// Compile the entry stylesheet
    Styles,

    /// Minify scripts
    Scripts,

    /// Optimize images through the persistent cache
    Images,

    /// Assemble the svg sprite in the source tree
    Sprite,

    /// Remove the output directory
    Clean,

    /// Invalidate the image-optimization cache
    Clear,
}

impl Commands {
    /// The single task this command runs, if it is a task command.
    pub const fn task(&self) -> Option<Task> {
        match self {
            Self::Pages => Some(Task::Pages),
            Self::Styles => Some(Task::Styles),
            Self::Scripts => Some(Task::Scripts),
            Self::Images => Some(Task::Images),
            Self::Sprite => Some(Task::Sprite),
            Self::Clean => Some(Task::Clean),
            Self::Clear => Some(Task::Clear),
            Self::Serve { .. } | Self::Build => None,
        }
    }
}
