//! Route table.

pub mod emr;
pub mod health;
pub mod medications;
pub mod sync;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::context::AppContext;

/// Build the full application router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/sync", post(sync::trigger_operator))
        .route("/api/sync/scheduled", post(sync::trigger_scheduled))
        .route("/api/sync/runs", get(sync::recent_runs))
        .route("/api/emr/connect", get(emr::connect))
        .route("/api/emr/callback", get(emr::callback))
        .route("/api/emr/connection", delete(emr::disconnect))
        .route("/api/emr/status", get(emr::status))
        .route(
            "/api/patients/{patient_id}/medications",
            post(medications::create).get(medications::list_for_patient),
        )
        .route(
            "/api/medications/{id}",
            get(medications::get_one).patch(medications::update).delete(medications::remove),
        )
        .route("/api/medications/{id}/discontinue", post(medications::discontinue))
        .route("/api/medications/{id}/audit", get(medications::audit_trail))
        .with_state(ctx)
}
