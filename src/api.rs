use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::file::{FileRecord, FileStore};

/// Path of the tracked file resource.
pub const FILE_ENDPOINT: &str = "/__slidev/file.json";

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<FileStore>,
}

pub fn router(store: Arc<FileStore>) -> Router {
    let state = ApiState { store };

    Router::new()
        .route(FILE_ENDPOINT, get(get_file).post(update_file))
        .with_state(state)
}

#[derive(Deserialize)]
struct UpdateFileRequest {
    raw: String,
}

async fn get_file(State(state): State<ApiState>) -> Json<FileRecord> {
    Json(state.store.read().await)
}

async fn update_file(
    State(state): State<ApiState>,
    Json(body): Json<UpdateFileRequest>,
) -> Result<Json<FileRecord>, StatusCode> {
    let record = state.store.write(body.raw).await.map_err(|e| {
        error!("[server] Failed to write {}: {}", state.store.path().display(), e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!(
        "[server] Wrote {} ({} bytes)",
        record.filepath,
        record.raw.len()
    );
    Ok(Json(record))
}
