use anyhow::Context;
use portfolio_api::{
    AppState,
    auth::{GoogleTokenInfoVerifier, IdentityState},
    config::{AppConfig, Env},
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    storage::{LocalDiskStorage, S3StorageClient, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, storage, identity verifier and
/// the HTTP server, in that order. Any startup failure aborts before binding.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().context("invalid configuration")?;

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise a verbose default for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_api=debug,tower_http=info,axum=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Repository: Postgres when configured, otherwise process memory.
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .context("failed to connect to Postgres, check DATABASE_URL")?;
            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory repository (data is lost on restart)");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 5. Storage: S3-compatible blob store, or the local upload directory.
    let storage: StorageState = match &config.blob_store {
        Some(blob) => {
            tracing::info!(bucket = %blob.bucket, "uploads go to the blob store");
            Arc::new(S3StorageClient::new(blob))
        }
        None => {
            tokio::fs::create_dir_all(&config.upload_dir)
                .await
                .with_context(|| format!("cannot create upload dir {}", config.upload_dir))?;
            tracing::info!(dir = %config.upload_dir, "uploads are stored on local disk");
            Arc::new(LocalDiskStorage::new(&config.upload_dir))
        }
    };

    // 6. Identity verifier for Google sign-in.
    if config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set; Google sign-in will be rejected");
    }
    let identity: IdentityState = Arc::new(GoogleTokenInfoVerifier::new(
        reqwest::Client::new(),
        config.google_client_id.clone(),
    ));

    // 7. Unified State Assembly
    let port = config.port;
    let app_state = AppState::new(repo, storage, identity, config);

    // 8. Router and Server Startup
    let app = create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    // Peer addresses feed the per-client rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
