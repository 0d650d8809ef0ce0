//! EMR connection lifecycle endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::authenticate;
use crate::context::AppContext;
use crate::errors::ApiError;

/// `GET /api/emr/connect` — hand back the provider consent URL.
pub async fn connect(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    let authorization_url = ctx.tokens.begin_authorization(&actor.id)?;
    Ok(Json(json!({ "authorization_url": authorization_url })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: String,
    /// Principal the authorization was started for; round-tripped through
    /// the OAuth `state` parameter
    state: String,
}

/// `GET /api/emr/callback` — provider redirect target. Unauthenticated by
/// nature; the one-time code and state carry the context.
pub async fn callback(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<Value>, ApiError> {
    let record = ctx.tokens.complete_authorization(&query.code, &query.state).await?;
    info!(principal_id = %record.principal_id, "EMR connection established");
    Ok(Json(json!({
        "connected": true,
        "provider": record.provider,
        "principal_id": record.principal_id,
    })))
}

/// `DELETE /api/emr/connection` — drop the stored credential.
pub async fn disconnect(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    ctx.tokens.disconnect(&actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/emr/status` — connection state for the reconnect UI.
pub async fn status(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    let credential = ctx.tokens.current_credential(&actor.id).await?;
    Ok(match credential {
        Some(record) => Json(json!({
            "connected": true,
            "provider": record.provider,
            "expires_at": record.expires_at,
        })),
        None => Json(json!({ "connected": false })),
    })
}
