//! Portal Server: application entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use portal_db::DbManager;
use portal_files::FileStore;
use portal_server::config::{Cli, Command};
use portal_server::{AppState, create_app, seed};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("portal=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    tracing::info!("Starting employee portal server...");

    let db = DbManager::connect(&config.db_config())
        .await
        .context("connecting to SurrealDB")?;
    let files = FileStore::open(&config.file_store_config()).context("opening upload directory")?;
    let auth = match cli.command {
        // Seeding never signs tokens, so the secret is optional there.
        Some(Command::Seed) => config.auth_config().unwrap_or_default(),
        _ => config.auth_config()?,
    };
    let state = AppState::new(
        db.client().clone(),
        auth,
        Arc::new(files),
        config.max_upload_bytes,
    );

    match cli.command {
        Some(Command::Seed) => {
            let report = seed::seed(&state).await?;
            tracing::info!(?report, "Seeding finished");
            return Ok(());
        }
        Some(Command::Serve { seed: true }) => {
            seed::seed(&state).await?;
        }
        Some(Command::Serve { seed: false }) | None => {}
    }

    let app = create_app(state, &config.cors_origins);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(address = %config.bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Employee portal server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
