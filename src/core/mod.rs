//! Core types shared by the CLI, tasks and watch loop.

mod state;
mod task;

pub use state::setup_shutdown_handler;
pub use task::Task;
