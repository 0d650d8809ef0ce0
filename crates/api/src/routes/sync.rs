//! Sync triggers and run history.
//!
//! The operator trigger and the scheduler trigger authenticate differently
//! but call the same orchestrator entry point and serialize the same
//! response type, so their bodies are interchangeable for any given report.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use carebridge_domain::{SyncReport, SyncRun};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{authenticate, check_scheduler_secret};
use crate::context::AppContext;
use crate::errors::ApiError;

#[derive(Debug, Serialize)]
struct SyncResponse {
    report: SyncReport,
    reauthorization_required: bool,
}

async fn run_sync(ctx: &AppContext, principal_id: &str) -> Response {
    let report = ctx.orchestrator.sync_all(principal_id).await;
    let reauthorization_required = report.all_auth_failures();

    // A run that failed entirely on rejected credentials is an upstream
    // auth problem; everything else is reported in the body.
    let status = if reauthorization_required {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    (status, Json(SyncResponse { report, reauthorization_required })).into_response()
}

/// `POST /api/sync` — operator-initiated full sync.
pub async fn trigger_operator(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    info!(actor_id = %actor.id, "operator sync trigger");
    Ok(run_sync(&ctx, &actor.id).await)
}

/// `POST /api/sync/scheduled` — scheduler-initiated full sync, authenticated
/// by shared secret. Same code path as the operator trigger.
pub async fn trigger_scheduled(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_scheduler_secret(&headers, &ctx.config.sync.scheduler_secret)?;
    info!(principal_id = %ctx.sync_principal_id, "scheduled sync trigger");
    Ok(run_sync(&ctx, &ctx.sync_principal_id).await)
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    limit: Option<usize>,
}

/// `GET /api/sync/runs` — most recent per-entity sync attempts.
pub async fn recent_runs(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<SyncRun>>, ApiError> {
    authenticate(ctx.identity.as_ref(), &headers).await?;
    let runs = ctx.sync_runs.recent(query.limit.unwrap_or(50).min(500)).await?;
    Ok(Json(runs))
}
