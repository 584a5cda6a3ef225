//! Process-wide state.
//!
//! The dev server, reload hub and watch loop run until the process is
//! terminated; Ctrl+C ends them together.

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// There is no graceful-shutdown sequence: the server, reload hub and watch
/// subscriptions end with the process.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        crate::log!("serve"; "shutting down...");
        std::process::exit(0);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
