use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use account_api::{
    accounts::PgAccountStore,
    audit::PgAuditStore,
    auth::TokenService,
    config::AppConfig,
    create_router, db,
    storage::LocalFileStorage,
    AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Account API - Starting...");

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let files = LocalFileStorage::new(&config.upload_dir);
    files
        .ensure_dir()
        .await
        .expect("Failed to create upload directory");

    let state = AppState::new(
        Arc::new(PgAccountStore::new(db_pool.clone())),
        Arc::new(PgAuditStore::new(db_pool)),
        Arc::new(files),
        TokenService::new(&config.jwt_secret),
        config.cookie_secure,
        config.max_avatar_bytes,
    );

    let app = create_router(state, &config.upload_dir);

    // Start the Axum server
    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Account API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    // Peer addresses feed the audit trail when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
