//! Terminal client for an Infinity-Core server.
//!
//! Connects to the server's `/ws` endpoint, keeps the connection alive across
//! drops, and turns stdin lines into chat prompts and commands.
//!
//! Run against a local server:
//!   cargo run -p infinity-console -- --host localhost:8000
//!   cargo run -p infinity-console -- --config infinity.toml --audio-dir clips

mod app;
mod command;
mod config;

use clap::Parser;
use config::{Args, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("infinity=info".parse()?))
        .init();

    let args = Args::parse();
    let settings = Settings::resolve(&args)?;

    tracing::info!("Connecting to {}", settings.client.endpoint);
    app::run(settings).await
}
