//! nav-prefetch CLI: replays recorded navigation traces through the
//! prefetch scheduler and prints what would have been prefetched.

use clap::Parser;
use tracing::info;

use nav_prefetch::config::{Cli, Config};
use nav_prefetch::replay::{self, Trace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "nav_prefetch=debug"
    } else {
        "nav_prefetch=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("nav-prefetch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Config::load(&cli.config)?;
    info!(
        origin = %config.origin,
        cache_capacity = ?config.cache.capacity,
        tick_ms = config.queue.tick_fallback_ms,
        "Configuration loaded"
    );

    // Load the trace.
    let trace = Trace::load(&cli.trace)?;
    info!(
        anchors = trace.anchors.len(),
        events = trace.events.len(),
        "Trace loaded"
    );

    let (report, scheduler) = replay::run(&config, &trace).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if cli.metrics {
        print!("{}", scheduler.metrics().encode()?);
    }

    Ok(())
}
