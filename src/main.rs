use anyhow::{Context, Result};
use casewatch::config::{load_config, WatchConfig};
use casewatch::delivery::SlackWebhook;
use casewatch::source::HttpSource;
use casewatch::Watcher;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casewatch=info".into()),
        )
        .init();

    info!("casewatch starting...");

    // Optional TOML file first, environment overrides on top
    let mut config = match std::env::var("CASEWATCH_CONFIG") {
        Ok(path) => load_config(&path).with_context(|| format!("Failed to load {}", path))?,
        Err(_) => WatchConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid configuration in environment")?;
    config.validate().context("Invalid configuration")?;

    info!(
        source_url = %config.source.url,
        channel = %config.slack.channel,
        state_file = %config.state.path.display(),
        interval_secs = config.poll.interval_seconds,
        "Configuration loaded"
    );

    let source = Arc::new(HttpSource::new(config.source.url.clone()));
    let sink = Arc::new(SlackWebhook::new(config.slack.webhook_url.clone()));
    let watcher = Watcher::new(&config, source, sink);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    watcher
        .run(shutdown)
        .await
        .context("Failed to initialize state file")?;

    info!("casewatch stopped");
    Ok(())
}
