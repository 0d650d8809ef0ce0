//! Request authentication.
//!
//! Operator requests carry a bearer token resolved to an [`Actor`] through
//! the [`IdentityProvider`] port; the scheduler trigger authenticates with a
//! shared secret header instead. Identity-provider internals stay behind the
//! port.

use async_trait::async_trait;
use axum::http::HeaderMap;
use carebridge_core::Actor;

use crate::errors::ApiError;

/// Header carrying the scheduler's shared secret.
pub const SCHEDULER_SECRET_HEADER: &str = "x-scheduler-secret";

/// Trait for resolving a bearer token to the acting clinician.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the token or fail; failures surface as 401
    async fn resolve(&self, bearer_token: &str) -> Result<Actor, ApiError>;
}

/// Single-operator identity adapter: one configured token maps to one actor.
///
/// Stands in for the practice's real identity service in single-tenant
/// deployments; tests and the dev binary use it directly.
pub struct StaticTokenIdentity {
    token: String,
    actor: Actor,
}

impl StaticTokenIdentity {
    pub fn new(token: impl Into<String>, actor: Actor) -> Self {
        Self { token: token.into(), actor }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve(&self, bearer_token: &str) -> Result<Actor, ApiError> {
        if bearer_token == self.token {
            Ok(self.actor.clone())
        } else {
            Err(ApiError::Unauthorized("unrecognized bearer token".into()))
        }
    }
}

/// Extract and resolve the bearer token from request headers.
pub async fn authenticate(
    identity: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Result<Actor, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;
    identity.resolve(token).await
}

/// Validate the scheduler's shared secret header.
pub fn check_scheduler_secret(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let presented = headers
        .get(SCHEDULER_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing scheduler secret".into()))?;
    if presented == expected {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid scheduler secret".into()))
    }
}
