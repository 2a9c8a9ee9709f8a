//! Mauri web server.
//!
//! Run with: cargo run -p mauri-web

use clap::Parser;
use mauri_common::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mauri_web::router::build_router;
use mauri_web::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "mauri-web", about = "Mauri pest guide web server")]
struct Args {
    /// Config file; defaults to `mauri.toml` or `MAURI_CONFIG`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep everything in memory instead of connecting to Postgres.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mauri_web=debug")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let mut config = Config::from_path(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => Config::load()?,
    };
    let addr: SocketAddr = config.server.socket_addr()?;

    info!("Starting Mauri web server...");
    let state = if args.memory {
        info!("Using in-memory store");
        AppState::in_memory(config)?
    } else {
        AppState::from_config(config).await?
    };
    info!(backend = ?state.db.backend(), "database ready");

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
