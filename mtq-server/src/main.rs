//! mtq-server - machine translation quality evaluation service

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mtq_common::config::{
    database_path, default_config_path, load_toml_config, resolve_root_folder, ROOT_FOLDER_ENV,
};
use mtq_common::db::{init_database, SqliteStore};
use mtq_server::{build_router, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mtq-server", version, about = "Machine translation quality evaluation service")]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "MTQ_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config_found = config_path.exists();
    let config = load_toml_config(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting mtq-server v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!("Loaded config from {}", config_path.display());
    } else {
        warn!("Config file not found at {}, using defaults", config_path.display());
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if config.admin_key_sha256.is_none() {
        warn!("No admin key configured: dataset upload and export are unauthenticated");
    }

    let settings = config.evaluation_settings();
    info!(
        practice_sentences = settings.practice_sentences,
        feedback_required = settings.feedback_required,
        "Evaluation settings"
    );

    let state = AppState::new(
        Arc::new(SqliteStore::new(pool)),
        settings,
        config.admin_key_sha256.clone(),
    );
    let app = build_router(state);

    let bind = args.bind.unwrap_or_else(|| config.bind_address.clone());
    let port = args.port.unwrap_or(config.port);
    let address = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("mtq-server listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
