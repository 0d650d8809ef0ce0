//! Reqwest-backed implementation of the EmrTransport port.

use std::time::Duration;

use async_trait::async_trait;
use carebridge_core::{EmrMethod, EmrTransport};
use carebridge_domain::{CareBridgeError, EmrConfig, EmrResponse, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Connection settings for the EMR API.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub api_base_url: String,
    pub timeout: Duration,
}

impl TransportSettings {
    pub fn from_config(config: &EmrConfig) -> Self {
        Self { api_base_url: config.api_base_url.clone(), timeout: Duration::from_secs(30) }
    }
}

/// HTTP transport for EMR API calls.
///
/// Folds every outcome into [`EmrResponse`]: provider rejections keep their
/// status and body, requests that never produced a response are classified
/// as transport failures. Callers branch; nothing here unwinds.
pub struct HttpEmrTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpEmrTransport {
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.api_base_url)
            .map_err(|e| CareBridgeError::Config(format!("invalid EMR base URL: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| CareBridgeError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self { http, base_url })
    }

    /// Resolve `endpoint` against the API base. Absolute URLs (pagination
    /// cursors) pass through untouched.
    fn resolve(&self, endpoint: &str) -> std::result::Result<Url, url::ParseError> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Url::parse(endpoint)
        } else {
            self.base_url.join(endpoint.trim_start_matches('/'))
        }
    }
}

fn method_of(method: EmrMethod) -> Method {
    match method {
        EmrMethod::Get => Method::GET,
        EmrMethod::Post => Method::POST,
        EmrMethod::Put => Method::PUT,
        EmrMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl EmrTransport for HttpEmrTransport {
    async fn send(
        &self,
        method: EmrMethod,
        endpoint: &str,
        bearer_token: &str,
        body: Option<&Value>,
    ) -> EmrResponse {
        let url = match self.resolve(endpoint) {
            Ok(url) => url,
            Err(e) => {
                warn!(endpoint, error = %e, "unresolvable EMR endpoint");
                return EmrResponse::transport_failure(format!("invalid endpoint: {e}"));
            }
        };

        let mut request = self.http.request(method_of(method), url).bearer_auth(bearer_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint, error = %e, "EMR request never completed");
                return EmrResponse::transport_failure(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let ok = response.status().is_success();

        // Non-JSON bodies are kept verbatim as a string value.
        let data = match response.text().await {
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Err(e) => return EmrResponse::transport_failure(format!("body read failed: {e}")),
        };

        debug!(endpoint, status, ok, "EMR response");
        EmrResponse { ok, status, data }
    }
}
