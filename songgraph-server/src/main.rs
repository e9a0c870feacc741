//! songgraph-server - playlist enrichment service
//!
//! Serves playlist lookup, starts enrichment jobs and streams their
//! progress over Server-Sent Events.

use anyhow::Result;
use clap::Parser;
use songgraph_common::config::TomlConfig;
use songgraph_server::config::{ServerOverrides, ServerSettings};
use songgraph_server::providers::Providers;
use songgraph_server::{api, jobs, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "songgraph-server", version, about = "Playlist tempo and sentiment enrichment service")]
struct Args {
    /// Address to listen on (e.g. 127.0.0.1:8000)
    #[arg(long)]
    bind: Option<String>,

    /// Concurrent tempo analyses
    #[arg(long)]
    bpm_max_workers: Option<usize>,

    /// Concurrent sentiment analyses
    #[arg(long)]
    sentiment_max_workers: Option<usize>,

    /// Path to config.toml
    #[arg(long, env = "SONGGRAPH_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (toml_config, config_source) = TomlConfig::load_resolved(args.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    config_source.log();

    info!("Starting songgraph-server");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = ServerOverrides {
        bind_address: args.bind,
        bpm_max_workers: args.bpm_max_workers,
        sentiment_max_workers: args.sentiment_max_workers,
    };
    let settings = ServerSettings::resolve(&overrides, &toml_config);

    let providers = Providers::from_settings(&settings)?;
    let state = AppState::new(providers, &settings);

    let reaper = jobs::spawn_reaper(state.jobs.clone(), settings.reaper_interval, settings.job_ttl);
    info!(
        "Job reaper: every {}s, TTL {}s",
        settings.reaper_interval.as_secs(),
        settings.job_ttl.as_secs()
    );

    let app = songgraph_server::build_router(state).layer(api::cors_layer(&settings.allowed_origins));

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!("Listening on http://{}", settings.bind_address);
    info!("Health check: http://{}/api/health", settings.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    info!("songgraph-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
