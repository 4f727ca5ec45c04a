use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use campus_chat::{LocalMediaStore, MediaStore};
use campus_config::load as load_config;
use campus_database::initialize_database;
use campus_gateway::{build_router, GatewayState};
use campus_identity::Authenticator;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "campus-backend", about = "Campus LMS chat backend")]
struct Cli {
    /// Path to the configuration file; overrides the default search paths
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("starting Campus backend");

    let cli = Cli::parse();
    if let Some(path) = cli.config {
        std::env::set_var("CAMPUS_CONFIG", path);
    }

    let config = load_config().context("failed to load configuration")?;

    let db_pool = initialize_database(&config.database)
        .await
        .context("failed to initialize database")?;

    let authenticator = Authenticator::new(db_pool.clone(), &config.auth);
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(&config.media));

    let state = GatewayState::new(db_pool, authenticator, media);
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

fn shutdown_signal() -> impl std::future::Future<Output = ()> {
    async {
        if let Err(error) = signal::ctrl_c().await {
            error!(?error, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
    }
}
