//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carebridge_domain::CareBridgeError;
use serde_json::json;

/// Error type returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// Request authentication failed (bearer token or scheduler secret)
    Unauthorized(String),
    /// Domain-level failure, mapped by variant
    Domain(CareBridgeError),
}

impl From<CareBridgeError> for ApiError {
    fn from(err: CareBridgeError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(message) => {
                let body = json!({
                    "error": {"type": "Unauthorized", "message": message},
                    "reauthorization_required": false,
                });
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::Domain(err) => {
                let status = match &err {
                    CareBridgeError::Validation(_) => StatusCode::BAD_REQUEST,
                    CareBridgeError::NotFound(_) => StatusCode::NOT_FOUND,
                    CareBridgeError::NotConnected(_) => StatusCode::CONFLICT,
                    CareBridgeError::ExchangeFailed(_)
                    | CareBridgeError::RefreshFailed(_)
                    | CareBridgeError::Transport(_) => StatusCode::BAD_GATEWAY,
                    CareBridgeError::Database(_)
                    | CareBridgeError::Config(_)
                    | CareBridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                // The serde-tagged error plus the reconnect hint the UI
                // routes on.
                let body = json!({
                    "error": err,
                    "reauthorization_required": err.requires_reauthorization(),
                });
                (status, Json(body)).into_response()
            }
        }
    }
}
