//! Serve command - renders pages on request

use std::{net::SocketAddr, sync::Arc};

use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use vro_core::Config;
use vro_generator::{Resolver, Site};

use crate::server::{ServerState, create_router};

/// Build the shared server state for `config`.
///
/// The layout is loaded here so a broken template is reported before the
/// server starts listening. In debug mode that is only a warning, since the
/// layout is reloaded on every render anyway.
pub fn prepare(config: &Config) -> Result<Arc<ServerState>> {
    let site = Site::from_config(config).wrap_err("Failed to open source tree")?;
    match site.pipeline().layout().preload() {
        Ok(()) => {}
        Err(e) if config.debug => tracing::warn!(error = %e, "Layout failed to load"),
        Err(e) => return Err(e).wrap_err("Failed to load layout"),
    }

    let resolver = Resolver::new(Arc::new(site)).with_source_serving(config.serve_source);
    Ok(Arc::new(ServerState::new(resolver)))
}

/// Run the serve command.
pub async fn run(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.port);
    tracing::info!(
        source = ?config.path,
        port,
        debug = config.debug,
        serve_source = config.serve_source,
        "Starting server"
    );

    let state = prepare(config)?;
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    println!();
    println!("  Server running at http://localhost:{port}");
    println!("  Press Ctrl+C to stop");
    println!();

    axum::serve(listener, app).await.wrap_err("Server error")?;

    Ok(())
}
