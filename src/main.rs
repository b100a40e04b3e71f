use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use beesides_api::auth::StaticSessions;
use beesides_api::config::AppConfig;
use beesides_api::database::MemoryStore;
use beesides_api::metadata::MusicBrainzClient;
use beesides_api::state::AppState;

#[derive(Parser)]
#[command(name = "beesides-api")]
#[command(about = "Beesides music catalog and review API")]
#[command(version)]
struct Args {
    #[arg(long, help = "Bind address (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Listen port (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Serve from an empty in-process store with no sessions")]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up SUPABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beesides_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!(environment = ?config.environment, "starting beesides-api");

    if args.memory && !config.is_development() {
        anyhow::bail!("--memory is only available with APP_ENV=development");
    }

    let state = if args.memory {
        tracing::warn!("using in-memory store; data is lost on exit");
        let client = reqwest::Client::builder().gzip(true).build()?;
        let metadata = Arc::new(MusicBrainzClient::new(client, &config.metadata));
        AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(StaticSessions::new()), metadata)
    } else {
        AppState::from_config(config).context("failed to build HTTP clients")?
    };

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, beesides_api::app(state)).await?;
    Ok(())
}
