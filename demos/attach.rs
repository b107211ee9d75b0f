//! Attach to a container and pipe this process's stdio through it.
//!
//! This example demonstrates:
//! - Loading an [`AttachConfig`] from a JSON file or the defaults
//! - Copying local stdin to the container and half-closing it at EOF
//! - Demultiplexing container stdout/stderr to the local streams
//!
//! # Running
//!
//! ```text
//! RUST_LOG=docker_attach=debug cargo run --example attach -- <container> [config.json]
//! echo hi | cargo run --example attach -- abc123
//! ```

use docker_attach::{AttachBuilder, AttachConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let container = args
        .next()
        .ok_or("usage: attach <container> [config.json]")?;
    let config = match args.next() {
        Some(path) => AttachConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => AttachConfig::default(),
    };

    let endpoint = config.parsed_endpoint()?;
    tracing::info!(%endpoint, container = %container, "attaching");

    let session = AttachBuilder::new(container)
        .config(&config)
        .stdin_reader(tokio::io::stdin())
        .stdout(tokio::io::stdout())
        .stderr(tokio::io::stderr())
        .connect(&endpoint)
        .await?;

    let output = session.wait_for().await?;
    tracing::info!(stats = ?output.stats, "detached");
    Ok(())
}
