//! VibeMovie Server
//!
//! Small movie catalogue with star ratings and comments, rendered as HTML.
//!
//! Uses Cosmos DB (or its local emulator) for storage, or an in-memory
//! store when `USE_INMEMORY` is set.

mod extractors;
mod handlers;
mod settings;
mod storage;
mod utils;
mod views;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use settings::Settings;
use storage::StoreSelector;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<StoreSelector>,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting VibeMovie Server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    info!("Loading configuration...");
    // Variables already set in the environment win over `.env`
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }
    let settings = Settings::from_env().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, in_memory={}, cosmos={}",
        settings.bind_address(),
        settings.use_inmemory,
        settings.cosmos.endpoint
    );

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .context("Failed to parse bind address")?;
    let static_dir = settings.static_dir.clone();

    // The server starts even when the store is down; pages degrade and the
    // next request retries the connection.
    let stores = Arc::new(StoreSelector::new(settings));
    if let Err(e) = stores.get().await {
        warn!("Store not ready at startup, will retry on demand: {}", e);
    }

    let app = router(AppState { stores }, static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

pub fn router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Pages
        .route("/", get(handlers::movies::index))
        .route("/movies", post(handlers::movies::create))
        .route("/movies/:id", get(handlers::movies::detail))
        .route("/movies/:id/rate", post(handlers::movies::rate))
        .route("/movies/:id/comment", post(handlers::movies::comment));

    if let Some(dir) = static_dir {
        info!("Static files directory: {}", dir);
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
