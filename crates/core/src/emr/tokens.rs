//! Token lifecycle management for the delegated EMR connection.
//!
//! Every access-token read goes back to the credential store and validates
//! freshness there; nothing is cached in process, so restarts and concurrent
//! workers always agree on what is persisted.

use std::sync::Arc;

use async_trait::async_trait;
use carebridge_domain::{CareBridgeError, CredentialRecord, Result};
use chrono::Utc;
use tracing::{debug, info, instrument};

use super::ports::{AccessTokenSource, CredentialStore, OAuthProvider};

/// Manages the OAuth credential lifecycle for one EMR provider.
///
/// Obtains the consent URL, exchanges authorization codes, refreshes expired
/// access tokens transparently, and deletes credentials on disconnect. All
/// persistence goes through the [`CredentialStore`] port.
pub struct TokenLifecycleManager {
    store: Arc<dyn CredentialStore>,
    oauth: Arc<dyn OAuthProvider>,
}

impl TokenLifecycleManager {
    pub fn new(store: Arc<dyn CredentialStore>, oauth: Arc<dyn OAuthProvider>) -> Self {
        Self { store, oauth }
    }

    /// Provider identifier credentials are stored under.
    pub fn provider_id(&self) -> &str {
        self.oauth.provider_id()
    }

    /// Build the provider consent URL for `principal_id`.
    ///
    /// Stateless; the only side effect is URL construction.
    pub fn begin_authorization(&self, principal_id: &str) -> Result<String> {
        self.oauth.authorize_url(principal_id)
    }

    /// Exchange a one-time authorization code and persist the credential.
    ///
    /// # Errors
    /// `ExchangeFailed` when the provider rejects the code, `Validation` when
    /// the token response is missing required material.
    #[instrument(skip(self, code), fields(principal_id))]
    pub async fn complete_authorization(
        &self,
        code: &str,
        principal_id: &str,
    ) -> Result<CredentialRecord> {
        let grant = self.oauth.exchange_code(code).await?;

        if grant.access_token.trim().is_empty() {
            return Err(CareBridgeError::Validation(
                "token response missing access_token".into(),
            ));
        }

        let record =
            grant.into_record(self.oauth.provider_id(), principal_id, None, Utc::now());
        self.store.upsert(&record).await?;

        info!(principal_id, provider = self.oauth.provider_id(), "EMR connection authorized");
        Ok(record)
    }

    /// Delete the stored credential. Idempotent: disconnecting a principal
    /// that was never connected is not an error.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, principal_id: &str) -> Result<()> {
        self.store.delete(self.oauth.provider_id(), principal_id).await?;
        info!(principal_id, "EMR connection removed");
        Ok(())
    }

    /// Current credential for `principal_id`, if any. Read-only; no refresh.
    pub async fn current_credential(&self, principal_id: &str) -> Result<Option<CredentialRecord>> {
        self.store.get(self.oauth.provider_id(), principal_id).await
    }

    async fn refresh_and_store(&self, record: CredentialRecord) -> Result<CredentialRecord> {
        let refresh_token = record.refresh_token.clone().ok_or_else(|| {
            CareBridgeError::RefreshFailed(format!(
                "no refresh token on file for principal {}",
                record.principal_id
            ))
        })?;

        let grant = self.oauth.refresh(&refresh_token).await?;
        let refreshed = grant.into_record(
            &record.provider,
            &record.principal_id,
            Some(refresh_token),
            Utc::now(),
        );

        // Single-row upsert; a concurrent refresh racing us resolves to
        // last-writer-wins, which only costs one redundant provider call.
        self.store.upsert(&refreshed).await?;

        debug!(principal_id = %refreshed.principal_id, "access token refreshed");
        Ok(refreshed)
    }
}

#[async_trait]
impl AccessTokenSource for TokenLifecycleManager {
    /// Return a valid access token for `principal_id`, refreshing when the
    /// stored one is expired or of unknown age.
    ///
    /// # Errors
    /// `NotConnected` when no credential exists; `RefreshFailed` when the
    /// provider refuses the refresh token (callers surface this as a
    /// reauthorization requirement, not a generic failure).
    async fn get_valid_access_token(&self, principal_id: &str) -> Result<String> {
        let record = self
            .store
            .get(self.oauth.provider_id(), principal_id)
            .await?
            .ok_or_else(|| CareBridgeError::NotConnected(principal_id.to_string()))?;

        if !record.is_expired(Utc::now()) {
            return Ok(record.access_token);
        }

        let refreshed = self.refresh_and_store(record).await?;
        Ok(refreshed.access_token)
    }
}
