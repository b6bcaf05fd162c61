//! Shim binary that calls into the `feedwatch` library's `inner_main`.
use clap::Parser as _;
use eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Delegate to library entrypoint
    feedwatch::inner_main(feedwatch::cli::Cli::parse()).await
}
