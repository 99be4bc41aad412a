use clinic_portal::{
    AppState,
    backend::{BackendState, HttpAuthBackend},
    config::{AppConfig, Env},
    create_router,
    initializer::SessionInitializer,
    session::SessionStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Starts the portal shell: configuration, logging, the backend client, the Session Store
/// and its one-time bootstrap, then the HTTP listener.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise debug for the crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clinic_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal shell starting in {:?} mode", config.env);

    // 3. Backend client
    let backend = HttpAuthBackend::new(&config.api_base_url, config.request_timeout)
        .expect("FATAL: could not build the backend client. Check CLINIC_API_URL.");
    let backend = Arc::new(backend) as BackendState;
    tracing::info!(
        "Clinic backend at {} (timeout {:?})",
        config.api_base_url,
        config.request_timeout
    );

    // 4. Session Store + bootstrap. The store lives for the whole process.
    let session = SessionStore::new(backend);
    let _bootstrap = SessionInitializer::mount(&session);

    // 5. Router and server
    let bind_addr = config.bind_addr.clone();
    let app_origins = config.allowed_origins.clone();
    let app = create_router(AppState { session, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind the listen address. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("Allowed front-end origins: {:?}", app_origins);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
