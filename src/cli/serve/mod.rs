//! Development server with live reload support.
//!
//! Serves the output tree, injects the live-reload client into HTML and
//! drives the watch loop. The browser is never opened automatically.

mod content;
mod lifecycle;
mod path;
mod response;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::cli::build::{log_outcomes, run_build_tasks};
use crate::config::{PipelineConfig, cfg};
use crate::embed::serve::RELOAD_JS_URL;
use crate::reload::ReloadHub;
use crate::task::TaskContext;
use crate::{debug, log, logger, watch};

/// Worker threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Server,
    addr: SocketAddr,
    root: PathBuf,
}

/// Bind the HTTP server without starting the request loop
pub fn bind_server(config: &PipelineConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    Ok(BoundServer {
        server,
        addr,
        root: config.output_dir().to_path_buf(),
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop (blocking).
    pub fn run(self, ws_port: u16) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("http-{i}"))
            .build()
            .context("Failed to create request thread pool")?;

        let root = Arc::new(self.root);
        for request in self.server.incoming_requests() {
            let root = Arc::clone(&root);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &root, ws_port) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, root: &Path, ws_port: u16) -> Result<()> {
    debug!("serve"; "{} {}", request.method(), request.url());

    let url_path = request.url().split(['?', '#']).next().unwrap_or_default();
    if url_path == RELOAD_JS_URL {
        return response::respond_reload_js(request, ws_port);
    }

    if let Some(path) = path::resolve_path(request.url(), root) {
        return response::respond_file(request, &path);
    }

    response::respond_not_found(request, root)
}

/// `sitepipe serve`: build once, then serve and watch until terminated.
pub fn serve() -> Result<()> {
    let config = cfg();
    let ctx = TaskContext::new(Arc::clone(&config));
    log_outcomes(&run_build_tasks(&ctx));

    let hub = ReloadHub::start(config.serve.interface, config.serve.reload_port)?;
    let server = bind_server(&config)?;
    log!("serve"; "http://{}", server.addr());
    debug!("reload"; "ws://{}:{}", config.serve.interface, hub.port());

    watch::spawn(ctx.with_hub(hub.clone()))?;
    log!("watch"; "watching {}", config.display_path(config.source_dir()));
    logger::status_detach();

    server.run(hub.port())
}
