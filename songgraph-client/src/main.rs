//! songgraph - terminal client
//!
//! Loads a playlist from a songgraph server, follows its enrichment job and
//! prints the track table and tempo/sentiment scatter.

use anyhow::{Context, Result};
use clap::Parser;
use songgraph_client::api::ApiClient;
use songgraph_client::config::ClientSettings;
use songgraph_client::{render, PlaylistView, SentimentMode, Session, SessionState};
use songgraph_common::config::TomlConfig;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "songgraph", version, about = "Playlist tempo and sentiment explorer")]
struct Args {
    /// Playlist URL, URI or id
    playlist_url: String,

    /// Server base URL
    #[arg(long)]
    server: Option<String>,

    /// Sentiment display mode
    #[arg(long, default_value = "relative")]
    mode: SentimentMode,

    /// Print the final projection as JSON
    #[arg(long)]
    json: bool,

    /// Follow an existing job instead of starting one
    #[arg(long)]
    job: Option<Uuid>,

    /// Path to config.toml
    #[arg(long, env = "SONGGRAPH_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (toml_config, config_source) = TomlConfig::load_resolved(args.config.as_deref())?;
    let settings = ClientSettings::resolve(args.server, &toml_config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    config_source.log();

    info!("Using server {}", settings.server_url);
    let api = ApiClient::new(&settings.server_url)?;
    let mut session = Session::new(Arc::new(api));
    session.set_mode(args.mode);

    session
        .load(&args.playlist_url)
        .await
        .with_context(|| format!("Failed to load playlist {}", args.playlist_url))?;
    if !args.json {
        print_view(&session);
    }

    let show_progress = |view: &PlaylistView| {
        if !args.json {
            eprintln!("{}", render::progress_line(view));
        }
    };
    let outcome = match args.job {
        Some(job_id) => session.resubscribe(job_id, show_progress).await,
        None => session.enrich(show_progress).await,
    };

    match &outcome {
        Ok(SessionState::Failed(message)) => warn!("Enrichment failed: {}", message),
        Ok(_) => {}
        Err(e) => {
            if let Some(job_id) = session.job_id() {
                warn!("{} (resume with --job {})", e, job_id);
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.projection())?);
    } else {
        print_view(&session);
    }

    outcome.map(|_| ()).map_err(Into::into)
}

fn print_view(session: &Session) {
    println!("{}", render::render(session.view(), &session.projection()));
}
