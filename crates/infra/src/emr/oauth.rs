//! OAuth2 authorization-code client for the EMR provider.

use async_trait::async_trait;
use carebridge_core::OAuthProvider;
use carebridge_domain::{CareBridgeError, EmrConfig, Result, TokenGrant};
use tracing::{debug, instrument};
use url::Url;

/// OAuth endpoints and client registration for one provider.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub provider: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthSettings {
    pub fn from_config(config: &EmrConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            authorization_endpoint: config.authorization_endpoint.clone(),
            token_endpoint: config.token_endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }
}

/// Elation-style OAuth2 provider adapter.
///
/// Token requests are form-encoded per RFC 6749; provider error bodies are
/// preserved in the returned error for diagnostics.
pub struct ElationOAuthProvider {
    http: reqwest::Client,
    settings: OAuthSettings,
}

impl ElationOAuthProvider {
    pub fn new(settings: OAuthSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CareBridgeError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self { http, settings })
    }

    async fn token_request(
        &self,
        form: &[(&str, &str)],
        reject: fn(String) -> CareBridgeError,
    ) -> Result<TokenGrant> {
        let response = self
            .http
            .post(&self.settings.token_endpoint)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| CareBridgeError::Transport(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CareBridgeError::Transport(format!("token body read failed: {e}")))?;

        if !status.is_success() {
            return Err(reject(format!("HTTP {}: {body}", status.as_u16())));
        }

        serde_json::from_str(&body)
            .map_err(|e| reject(format!("malformed token response: {e}")))
    }
}

#[async_trait]
impl OAuthProvider for ElationOAuthProvider {
    fn provider_id(&self) -> &str {
        &self.settings.provider
    }

    fn authorize_url(&self, principal_id: &str) -> Result<String> {
        let mut url = Url::parse(&self.settings.authorization_endpoint)
            .map_err(|e| CareBridgeError::Config(format!("invalid authorization endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("state", principal_id);
        Ok(url.into())
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        let grant = self
            .token_request(
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", &self.settings.redirect_uri),
                ],
                CareBridgeError::ExchangeFailed,
            )
            .await?;
        debug!("authorization code exchanged");
        Ok(grant)
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let grant = self
            .token_request(
                &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
                CareBridgeError::RefreshFailed,
            )
            .await?;
        debug!("access token refreshed");
        Ok(grant)
    }
}
