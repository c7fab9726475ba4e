//! bnbi-dash - rental investment dashboard service
//!
//! Serves cleaned short-term-rental listings and the dashboard views over
//! HTTP/JSON. Listings come from a document store export or the analytical
//! store; area reference data always comes from the analytical store.

use anyhow::{bail, Context, Result};
use bnbi_common::config::{load_toml_config, resolve_config_file, ConfigOrigin, CONFIG_ENV_VAR};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::signal;
use tracing::{info, warn};

use bnbi_dash::config::{Backend, DashConfig, CONFIG_FILE_NAME};
use bnbi_dash::loader::Dataset;
use bnbi_dash::source::{AnalyticalSource, DocumentSource, RecordSource};
use bnbi_dash::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "bnbi-dash", version, about = "Rental investment dashboard service")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port (overrides the configuration file)
    #[arg(short, long, env = "BNBI_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration picks the log level and file, so it loads before the
    // subscriber; its outcome is logged right after init
    let config_path = resolve_config_file(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let (mut config, origin): (DashConfig, _) = load_toml_config(config_path.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    // RUST_LOG wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            subscriber.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => subscriber.init(),
    }

    // Build identification first, before any source I/O
    info!(
        "Starting bnbi-dash v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &origin {
        ConfigOrigin::File(_) => info!("Loaded configuration from {}", origin),
        ConfigOrigin::Defaults => warn!("No configuration file found, using {}", origin),
    }

    let analytical = if config.analytical.database_path.exists() {
        Some(
            AnalyticalSource::connect(
                &config.analytical.database_path,
                config.analytical.listings_table.clone(),
                config.analytical.area_table.clone(),
            )
            .await
            .context("Failed to open analytical store")?,
        )
    } else {
        warn!(
            "Analytical store not found: {}",
            config.analytical.database_path.display()
        );
        None
    };

    let listings_source = match config.listings.backend {
        Backend::Analytical => match &analytical {
            Some(source) => RecordSource::Analytical(source.clone()),
            None => bail!(
                "Analytical backend selected but {} does not exist",
                config.analytical.database_path.display()
            ),
        },
        Backend::Document => match (&config.document.path, &config.document.url) {
            (Some(path), _) => RecordSource::Document(DocumentSource::file(path.clone())),
            (None, Some(url)) => RecordSource::Document(DocumentSource::http(url.clone())),
            (None, None) => bail!("Document backend selected but neither [document] path nor url is set"),
        },
    };
    info!("Listings source: {}", listings_source.id());

    let dataset = Dataset::new(
        listings_source,
        analytical,
        config.clean_options(),
        config.cache.ttl(),
    );
    let app = build_router(AppState::new(dataset));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("bnbi-dash listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
