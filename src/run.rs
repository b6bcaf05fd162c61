use alloc::string;
use core::net::{IpAddr, SocketAddr};
use std::path::Path;

use tokio::{net, signal};

use crate::{
    app::{self, AppState},
    http::server,
};

/// Creates a future that resolves when a shutdown signal is received.
pub(crate) async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to create SIGTERM signal handler");
        let _ = sigterm.recv().await;
    }
    #[cfg(not(unix))]
    {
        drop(signal::ctrl_c().await);
    }
}

/// Start the HTTP server.
pub(crate) async fn start_server(
    app_state: AppState,
    listen_ip: IpAddr,
    listen_port: u16,
) -> eyre::Result<()> {
    let app = server::create_app(app_state);

    let addr = SocketAddr::from((listen_ip, listen_port));

    tracing::info!("Listening on http://{}", addr);
    let listener = net::TcpListener::bind(addr).await?;
    let serving = axum::serve(listener, app);
    tokio::select! {
        res = serving => res?,
        () = shutdown_signal() => {
            tracing::info!("Received shutdown, shutting down");
        }
    }

    Ok(())
}

/// Load the config, initialize state and serve until termination.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the server
/// cannot bind.
pub(crate) async fn start(
    config_path: &Path,
    port_override: Option<u16>,
    bind_override: Option<&str>,
) -> eyre::Result<()> {
    tracing::info!("Starting HTTP server...");

    let app_state = app::initialize_state(config_path).await?;

    // Apply optional overrides from CLI/tests
    let listen_port = port_override.unwrap_or(app_state.config.server.port);
    let bind_str = bind_override.map_or_else(
        || app_state.config.server.bind.clone(),
        string::ToString::to_string,
    );

    let listen_ip: IpAddr = bind_str.parse()?;

    start_server(app_state, listen_ip, listen_port).await
}
