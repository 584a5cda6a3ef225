//! sitepipe - static-site asset pipeline with a live-reload dev server.

mod asset;
mod cache;
mod cli;
mod config;
mod core;
mod embed;
mod image;
mod logger;
mod reload;
mod sprite;
mod task;
mod template;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{PipelineConfig, init_config};
use task::TaskContext;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = init_config(PipelineConfig::load(&cli)?);

    let command = cli.command.unwrap_or(Commands::Serve {
        interface: None,
        port: None,
    });
    if let Some(task) = command.task() {
        return cli::build::run_single(task, &TaskContext::new(config));
    }

    match command {
        Commands::Build => cli::build::build_all(&TaskContext::new(config)),
        _ => cli::serve::serve(),
    }
}
