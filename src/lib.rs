//! Library entry for the `feedwatch` service.
//!
//! Exposes `inner_main` so the shim binary and the integration tests can call
//! into the service logic.
//!
//! `feedwatch` watches network reachability and automatically fails a video
//! call demo over from its live feed to a looping backup asset, with manual
//! override endpoints and a small embedded Web-GUI.

extern crate alloc;
extern crate core;

pub mod app;
pub mod cli;
pub mod config;
pub mod http;
pub mod run;
pub mod websocket;

use std::env;
use std::fs;
use std::sync::Once;

use eyre::{Result, WrapErr as _};
use tracing::{Instrument as _, info};
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cli::{Cli, Command, LogFormat};

// for use in integration tests
pub use app::{ConnectionStatus, FeedChoice, Snapshot};
pub use websocket::WsMessage;

static INIT_TRACING: Once = Once::new();

/// The service's main function; can be called from a shim binary.
///
/// Parses CLI and launches the web service.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the server fails to
/// start.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    match invocation.command {
        Command::Serve(args) => {
            let config = &args.config;
            let config_path =
                fs::canonicalize(config).wrap_err(format!("Config file not found at: {config}"))?;

            INIT_TRACING.call_once(move || {
                let default_level = if env::var("FEEDWATCH_INTEGRATION_TEST").is_ok() {
                    "error"
                } else {
                    "info"
                };

                let builder = tracing_subscriber::fmt()
                    .with_env_filter(
                        EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| EnvFilter::new(default_level)),
                    )
                    .with_timer(ChronoLocal::rfc_3339());

                match args.log_format {
                    LogFormat::Compact => builder.compact().init(),
                    LogFormat::Json => builder.json().init(),
                    LogFormat::Pretty => builder.pretty().init(),
                }
            });

            // Startup span holding the resolved config path for the lifetime of
            // service initialization.
            let startup_span = tracing::info_span!("feedwatch.startup", ?config_path, pid = ?std::process::id(), version = env!("CARGO_PKG_VERSION"));
            startup_span.in_scope(|| info!("Starting feedwatch"));

            // Pass through optional port/bind overrides from CLI
            run::start(&config_path, args.port, args.bind.as_deref())
                .instrument(startup_span)
                .await?;
            Ok(())
        }
    }
}
