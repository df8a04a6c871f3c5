//! tsbeacon - TeamSpeak status in Discord

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tsbeacon::config::Config;
use tsbeacon::{logging, render};
use tsbeacon_bridge::Bridge;
use tsbeacon_core::StateSource;
use tsbeacon_discord::DiscordSink;
use tsbeacon_query::TeamSpeakSource;

#[derive(Parser)]
#[command(
    name = "tsbeacon",
    version,
    about = "Display TeamSpeak server status in a Discord channel"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Fetch TeamSpeak state once and print it, without touching Discord
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).context("failed to load configuration")?;
    let _guard = logging::init(&config.logging)?;

    let source = Arc::new(TeamSpeakSource::new(config.teamspeak_config()));

    if cli.dry_run {
        return dry_run(source.as_ref(), &config).await;
    }

    let sink = Arc::new(DiscordSink::new(config.discord_config()));
    let bridge = Bridge::new(config.bridge_config(), source, sink);

    let cancel = CancellationToken::new();
    let handle = bridge
        .start(cancel.clone())
        .await
        .context("failed to start bridge")?;

    shutdown_signal().await;
    info!("Received shutdown signal");
    cancel.cancel();

    if let Err(e) = handle.stop().await {
        warn!(error = %e, "Error stopping bridge");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn dry_run(source: &TeamSpeakSource, config: &Config) -> anyhow::Result<()> {
    info!("Running in dry-run mode");

    source
        .start()
        .await
        .context("failed to connect to TeamSpeak")?;

    let snapshot = source.fetch_snapshot().await;
    if let Err(e) = source.stop().await {
        warn!(error = %e, "Error disconnecting from TeamSpeak");
    }
    let snapshot = snapshot.context("failed to get TeamSpeak state")?;

    println!();
    println!("{}", render::render(&snapshot, &config.display_options()));
    println!();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
