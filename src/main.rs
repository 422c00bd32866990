use library_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    resource::{HttpResourceApi, ResourceState},
    session::SessionStore,
    storage::{FileKeyValueStore, KeyValueState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, opens the session store, builds the
/// resource API client and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise debug for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "library_portal=debug,tower_http=info".into());

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

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Session store (JSON key/value file)
    let store = FileKeyValueStore::new(&config.session_store_path)
        .expect("FATAL: Cannot open the session store. Check SESSION_STORE_PATH.");
    tracing::info!("Session store at {}", store.path().display());
    let sessions = SessionStore::new(Arc::new(store) as KeyValueState);

    // 4. Resource API client
    let resources = Arc::new(
        HttpResourceApi::new(&config.api_base_url)
            .expect("FATAL: RESOURCE_API_URL is not a valid base URL."),
    ) as ResourceState;
    tracing::info!("Resource API at {}", config.api_base_url);

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        resources,
        sessions,
        config,
    };

    // 5. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Cannot bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await.expect("HTTP server terminated unexpectedly");
}
