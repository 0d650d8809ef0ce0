//! Health endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use carebridge_domain::CareBridgeError;
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::errors::ApiError;

/// Liveness plus a database round trip.
pub async fn health(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    let db = Arc::clone(&ctx.db);
    tokio::task::spawn_blocking(move || db.health_check())
        .await
        .map_err(|e| CareBridgeError::Internal(format!("health task panicked: {e}")))??;
    Ok(Json(json!({"status": "ok"})))
}
