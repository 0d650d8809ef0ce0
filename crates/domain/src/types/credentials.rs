//! Delegated EMR access credentials.
//!
//! One `CredentialRecord` per (provider, principal) pair. The credential
//! store is the only component allowed to persist these; everything else
//! passes them around by value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted OAuth credential for one principal at one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Provider identifier (e.g. "elation")
    pub provider: String,
    /// Principal the tokens were delegated to (clinician / practice user id)
    pub principal_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absolute expiry of the access token. `None` means the provider issues
    /// non-expiring (or externally validated) tokens.
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// True when the access token must be refreshed before use.
    ///
    /// An absent expiry is treated as expired so that every read revalidates
    /// against the provider rather than trusting a token of unknown age.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }
}

/// Token material returned by the provider's token endpoint.
///
/// Produced by both the authorization-code exchange and the refresh grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, when the provider reports one
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Fold this grant into a credential record for `principal`.
    ///
    /// A refresh response frequently omits the refresh token; in that case
    /// the previous refresh token is carried forward.
    pub fn into_record(
        self,
        provider: &str,
        principal_id: &str,
        previous_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> CredentialRecord {
        CredentialRecord {
            provider: provider.to_string(),
            principal_id: principal_id.to_string(),
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            token_type: self.token_type,
            scope: self.scope,
            updated_at: now,
        }
    }
}
