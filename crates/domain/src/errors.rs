//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CareBridge
///
/// The EMR integration variants (`NotConnected`, `ExchangeFailed`,
/// `RefreshFailed`) are user-actionable: the clinician has to (re)authorize
/// the EMR connection. `Transport` covers network-level failures and is kept
/// distinct from provider-side rejections so sync code can classify outcomes.
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CareBridgeError {
    #[error("No EMR credentials on file: {0}")]
    NotConnected(String),

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CareBridgeError {
    /// True when the only remedy is re-running the EMR authorization flow.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Self::NotConnected(_) | Self::ExchangeFailed(_) | Self::RefreshFailed(_)
        )
    }
}

/// Result type alias for CareBridge operations
pub type Result<T> = std::result::Result<T, CareBridgeError>;
