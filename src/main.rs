//! Bookdex -- book-cataloging HTTP API with cover-image object storage.
//!
//! Startup wires the three pieces of [`bookdex::AppState`] together from
//! configuration: the catalog store (SQLite or in-memory), the cover
//! blob store (local filesystem, AWS S3 gateway, in-memory, or disabled),
//! and the URL signer for locally served cover blobs. A failed catalog
//! open does not abort startup: the server boots with the catalog marked
//! unavailable and reports the failure on every catalog operation.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use bookdex::catalog::Catalog;
use bookdex::covers::sign::UrlSigner;
use bookdex::covers::Covers;

/// Command-line arguments for the Bookdex server.
#[derive(Parser, Debug)]
#[command(
    name = "bookdex",
    version,
    about = "Book-cataloging HTTP API with cover-image object storage"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "bookdex.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match bookdex::config::load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            // Logging is not up yet; stderr is all we have.
            eprintln!(
                "could not read config file {}: {err:#}; using defaults",
                cli.config
            );
            bookdex::config::Config::default()
        }
    };

    init_tracing(&config.logging);
    info!("Configuration loaded from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register metric descriptions.
    bookdex::metrics::init_metrics();
    bookdex::metrics::describe_metrics();
    info!("Prometheus metrics initialized");

    // Catalog store. An open failure is tolerated: the server still boots
    // and every catalog operation reports the stored reason.
    let catalog = match config.catalog.engine.as_str() {
        "memory" => {
            info!("In-memory catalog store initialized");
            Catalog::Ready(Arc::new(
                bookdex::catalog::memory::MemoryCatalogStore::new(),
            ))
        }
        _ => {
            let path = &config.catalog.sqlite.path;
            match open_sqlite_catalog(path) {
                Ok(store) => {
                    info!("SQLite catalog store initialized at {path}");
                    Catalog::Ready(Arc::new(store))
                }
                Err(err) => {
                    error!("Failed to open catalog at {path}: {err:#}");
                    Catalog::Unavailable(err.to_string())
                }
            }
        }
    };

    // Cover blob store.
    let mut cover_signer = None;
    let covers = match config.covers.backend.as_str() {
        "none" => {
            warn!("Cover storage disabled; cover operations will be rejected");
            Covers::Disabled
        }
        "memory" => {
            info!("In-memory cover store initialized");
            Covers::Enabled(Arc::new(bookdex::covers::memory::MemoryCoverStore::new()))
        }
        "aws" => {
            let aws_config = config.covers.aws.as_ref().ok_or_else(|| {
                anyhow::anyhow!("covers.backend is 'aws' but covers.aws config section is missing")
            })?;
            let store = bookdex::covers::aws::AwsCoverStore::new(aws_config).await?;
            info!(
                "AWS S3 cover store initialized: bucket={} region={} prefix='{}'",
                aws_config.bucket, aws_config.region, aws_config.prefix
            );
            Covers::Enabled(Arc::new(store))
        }
        "local" | _ => {
            let local = &config.covers.local;
            let signer = UrlSigner::new(&local.signing_secret, &local.public_base_url);
            let store =
                bookdex::covers::local::LocalCoverStore::new(&local.root_dir, signer.clone())?;
            info!("Local cover store initialized at {}", local.root_dir);
            cover_signer = Some(signer);
            Covers::Enabled(Arc::new(store))
        }
    };

    let state = Arc::new(bookdex::AppState {
        config: config.clone(),
        catalog,
        covers,
        cover_signer,
    });

    let app = bookdex::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Bookdex listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Bookdex shut down");

    Ok(())
}

/// Open the SQLite catalog store, creating the parent directory first.
fn open_sqlite_catalog(path: &str) -> anyhow::Result<bookdex::catalog::sqlite::SqliteCatalogStore> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    bookdex::catalog::sqlite::SqliteCatalogStore::new(path)
}

/// Initialize the tracing subscriber from the logging config. `RUST_LOG`
/// takes precedence over the configured level.
fn init_tracing(logging: &bookdex::config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.clone()));
    if logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
