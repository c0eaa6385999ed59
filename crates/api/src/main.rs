use std::net::SocketAddr;
use std::sync::Arc;

use gallery_cloud::{CdnRewrite, MemoryObjectStore, ObjectStore, S3ObjectStore};
use gallery_core::identity::{JobIdentity, OutputKeyIdentity, RegexIdentity};
use gallery_db::{MediaStore, MemoryMediaStore, PgMediaStore};
use gallery_gateway::HttpGateway;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gallery_api::config::{ServerConfig, StoreBackend};
use gallery_api::router::build_app_router;
use gallery_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gallery_api=debug,gallery_pipeline=debug,gallery_gateway=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store_backend = ?config.store_backend,
        "Loaded server configuration",
    );

    // --- Stores ---
    let cdn = CdnRewrite::new(&config.cdn_domain);
    let (store, objects): (Arc<dyn MediaStore>, Arc<dyn ObjectStore>) = match config.store_backend
    {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set when STORE_BACKEND=postgres");

            let pool = gallery_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            gallery_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            gallery_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let objects = S3ObjectStore::connect(config.s3.clone(), cdn).await;
            tracing::info!(bucket = %objects.bucket(), "Object store configured");

            let store: Arc<dyn MediaStore> = Arc::new(PgMediaStore::new(pool));
            let objects: Arc<dyn ObjectStore> = Arc::new(objects);
            (store, objects)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; records are lost on restart");
            let store: Arc<dyn MediaStore> = Arc::new(MemoryMediaStore::new());
            let objects: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new(cdn));
            (store, objects)
        }
    };

    // --- Generation gateway ---
    let gateway = HttpGateway::new(config.gateway.clone()).expect("Invalid gateway configuration");
    tracing::info!(endpoint = %config.gateway.endpoint, "Generation gateway configured");

    let identity: Arc<dyn JobIdentity> = match config.job_id_pattern.as_deref() {
        Some(pattern) => {
            Arc::new(RegexIdentity::new(pattern).expect("JOB_ID_PATTERN must be a valid regex"))
        }
        None => Arc::new(OutputKeyIdentity::default()),
    };

    // --- App state ---
    let state = AppState::new(config.clone(), store, objects, Arc::new(gateway), identity);
    let reconciler = Arc::clone(&state.reconciler);

    // --- Recovery ---
    match reconciler.recover().await {
        Ok(armed) => tracing::info!(armed, "Pending video jobs re-armed"),
        Err(e) => tracing::error!(error = %e, "Recovery failed, pending jobs left to sync"),
    }

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // In-flight jobs stay InProgress and are re-armed on the next start.
    reconciler.shutdown().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
