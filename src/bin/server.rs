//! deck-sync-server: serve one slide deck file to live-editing clients
//!
//! Usage:
//!   deck-sync-server slides.md
//!   deck-sync-server --port 4000 talk/slides.md
//!   deck-sync-server --no-dev slides.md      # no push channel, no watcher

use clap::Parser;
use deck_sync::{
    cli::ServerArgs, create_router_with_config, file::FileStore, watcher::spawn_file_watcher,
    RouterConfig,
};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = match FileStore::open(&args.file).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("[server] Cannot open {}: {}", args.file.display(), e);
            std::process::exit(1);
        }
    };

    let development_mode = !args.no_dev;
    let _watcher = if development_mode {
        Some(spawn_file_watcher(store.clone())?)
    } else {
        tracing::info!("[server] Development mode off: push channel disabled");
        None
    };

    let app = create_router_with_config(store.clone(), RouterConfig { development_mode });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[server] Serving {} on http://{}", args.file.display(), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = signal::ctrl_c().await;
            tracing::info!("[server] Received Ctrl+C");
            // Push streams never end on their own
            store.shutdown();
        })
        .await?;

    tracing::info!("[server] Shutdown complete");
    Ok(())
}
