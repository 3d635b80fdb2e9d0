pub mod api;
pub mod cli;
pub mod config;
pub mod events;
pub mod file;
pub mod sse;
pub mod sync;
pub mod watcher;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use file::FileStore;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Mount the push channel. Without it clients only see what they read
    /// or write themselves.
    pub development_mode: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            development_mode: true,
        }
    }
}

pub fn create_router(store: Arc<FileStore>) -> Router {
    create_router_with_config(store, RouterConfig::default())
}

pub fn create_router_with_config(store: Arc<FileStore>, config: RouterConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(api::router(store.clone()));

    if config.development_mode {
        app = app.merge(sse::router(store));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
