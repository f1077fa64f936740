use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triup_console::{
    AppState,
    backend::{BackendState, HttpBackend},
    config::{AppConfig, Env},
    create_router,
    pipeline::{XlsxEncoder, export::EncoderState},
    session::SessionStore,
    storage::{FileStorage, MemoryStorage, StorageState},
};

/// main
///
/// Entry point of the console host: configuration, logging, session store, backend
/// client, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise verbose for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "triup_console=debug,tower_http=info,axum=trace".into());

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

    tracing::info!("Console starting in {:?} mode", config.env);

    // 3. Session store. An unreadable store file degrades to memory: sessions then last
    // only as long as the process, which the guard handles like an empty store.
    let storage: StorageState = match &config.session_store_path {
        Some(path) => match FileStorage::open(path) {
            Ok(store) => {
                tracing::info!(path = %path.display(), "session store opened");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "session store unavailable, using memory: {}", e);
                Arc::new(MemoryStorage::new())
            }
        },
        None => Arc::new(MemoryStorage::new()),
    };
    let sessions = SessionStore::new(storage);

    // 4. Backend client and export encoder.
    let backend = Arc::new(HttpBackend::new(&config.api_url)) as BackendState;
    tracing::info!(api_url = %config.api_url, "backend configured");
    let encoder = Arc::new(XlsxEncoder) as EncoderState;

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        backend,
        sessions,
        encoder,
        config,
    };

    // 5. Router and server.
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: server terminated unexpectedly.");
}
