//! Port interfaces for the EMR synchronization engine
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use carebridge_domain::{CredentialRecord, EmrResponse, Result, SyncRun, TokenGrant};
use serde_json::Value;

/// HTTP method for EMR API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmrMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// Trait for persisting delegated OAuth credentials.
///
/// The implementation owns the `credentials` table exclusively; upserts must
/// be atomic per row (concurrent refreshes may race, last writer wins).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential for one principal at one provider
    async fn get(&self, provider: &str, principal_id: &str) -> Result<Option<CredentialRecord>>;

    /// Insert or replace, keyed by (provider, principal_id)
    async fn upsert(&self, record: &CredentialRecord) -> Result<()>;

    /// Remove the credential; succeeds even when none exists
    async fn delete(&self, provider: &str, principal_id: &str) -> Result<()>;
}

/// Trait for the provider's OAuth2 endpoints.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider identifier stored on credential rows
    fn provider_id(&self) -> &str;

    /// Build the consent URL for the authorization-code flow
    fn authorize_url(&self, principal_id: &str) -> Result<String>;

    /// Exchange a one-time authorization code for tokens
    ///
    /// Fails with `ExchangeFailed` when the provider rejects the code; the
    /// provider's error body is preserved for diagnostics.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    /// Redeem a refresh token for a fresh access token
    ///
    /// Fails with `RefreshFailed` when the provider refuses the token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Trait for the raw HTTP leg of EMR API calls.
///
/// Infallible by design: provider rejections and network-level failures are
/// both folded into the returned [`EmrResponse`] classification so sync code
/// can branch instead of unwinding.
#[async_trait]
pub trait EmrTransport: Send + Sync {
    /// Execute one request. `endpoint` is either a path relative to the
    /// provider's API base or an absolute URL (pagination `next` pointers
    /// arrive absolute).
    async fn send(
        &self,
        method: EmrMethod,
        endpoint: &str,
        bearer_token: &str,
        body: Option<&Value>,
    ) -> EmrResponse;
}

/// Trait for obtaining a currently-valid access token for a principal.
///
/// Implemented by the token lifecycle manager; kept as a one-method port so
/// the EMR client stays mock-testable.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Return a fresh access token, refreshing first when needed
    async fn get_valid_access_token(&self, principal_id: &str) -> Result<String>;
}

/// Trait for persisting sync run outcomes (observability).
#[async_trait]
pub trait SyncRunStore: Send + Sync {
    /// Append one per-entity run record
    async fn record(&self, run: &SyncRun) -> Result<()>;

    /// Most recent runs, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<SyncRun>>;
}
