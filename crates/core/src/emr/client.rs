//! Authenticated EMR API client.

use std::sync::Arc;

use carebridge_domain::{EmrResponse, Result};
use serde_json::Value;

use super::ports::{AccessTokenSource, EmrTransport};

pub use super::ports::EmrMethod;

/// Client for authenticated calls against the connected EMR.
///
/// Pairs an [`AccessTokenSource`] with an [`EmrTransport`]: every request
/// resolves a currently-valid token first (refreshing if needed), then hands
/// the wire work to the transport. Credential problems surface as `Err`;
/// everything that happened on the wire comes back inside [`EmrResponse`].
pub struct EmrClient {
    transport: Arc<dyn EmrTransport>,
    tokens: Arc<dyn AccessTokenSource>,
}

impl EmrClient {
    pub fn new(transport: Arc<dyn EmrTransport>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self { transport, tokens }
    }

    /// Execute one request on behalf of `principal_id`.
    ///
    /// `endpoint` may be a path relative to the provider's API base or an
    /// absolute URL (pagination cursors arrive absolute).
    ///
    /// # Errors
    /// Only credential-resolution failures (`NotConnected`, `RefreshFailed`)
    /// return `Err`; HTTP-level rejections are folded into the response.
    pub async fn request(
        &self,
        method: EmrMethod,
        endpoint: &str,
        principal_id: &str,
        body: Option<&Value>,
    ) -> Result<EmrResponse> {
        let token = self.tokens.get_valid_access_token(principal_id).await?;
        Ok(self.transport.send(method, endpoint, &token, body).await)
    }

    /// Convenience GET.
    pub async fn get(&self, endpoint: &str, principal_id: &str) -> Result<EmrResponse> {
        self.request(EmrMethod::Get, endpoint, principal_id, None).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use carebridge_domain::CareBridgeError;
    use serde_json::json;

    use super::*;

    struct RecordingTransport {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmrTransport for RecordingTransport {
        async fn send(
            &self,
            _method: EmrMethod,
            endpoint: &str,
            bearer_token: &str,
            _body: Option<&Value>,
        ) -> EmrResponse {
            self.seen
                .lock()
                .unwrap()
                .push((endpoint.to_string(), bearer_token.to_string()));
            EmrResponse::success(200, json!({"results": []}))
        }
    }

    struct FixedTokens(Option<String>);

    #[async_trait]
    impl AccessTokenSource for FixedTokens {
        async fn get_valid_access_token(&self, principal_id: &str) -> Result<String> {
            self.0
                .clone()
                .ok_or_else(|| CareBridgeError::NotConnected(principal_id.to_string()))
        }
    }

    #[tokio::test]
    async fn request_attaches_resolved_token() {
        let transport = Arc::new(RecordingTransport { seen: Mutex::new(Vec::new()) });
        let client =
            EmrClient::new(transport.clone(), Arc::new(FixedTokens(Some("at-1".into()))));

        let response = client.get("patients/?limit=50", "clin-1").await.unwrap();
        assert!(response.ok);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("patients/?limit=50".to_string(), "at-1".to_string())]);
    }

    #[tokio::test]
    async fn credential_failure_short_circuits_before_the_wire() {
        let transport = Arc::new(RecordingTransport { seen: Mutex::new(Vec::new()) });
        let client = EmrClient::new(transport.clone(), Arc::new(FixedTokens(None)));

        let err = client.get("patients/", "clin-1").await.unwrap_err();
        assert!(matches!(err, CareBridgeError::NotConnected(_)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }
}
