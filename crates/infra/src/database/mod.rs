//! SQLite persistence layer.

pub mod credential_repository;
pub mod manager;
pub mod medication_repository;
pub mod sync_run_repository;

pub use credential_repository::SqliteCredentialStore;
pub use medication_repository::SqliteMedicationStore;
pub use sync_run_repository::SqliteSyncRunStore;

use carebridge_domain::{CareBridgeError, Result};
use chrono::{DateTime, Utc};

/// Unix-seconds column to `DateTime<Utc>`; out-of-range values are a
/// corrupt-row error, not a panic.
pub(crate) fn datetime_from_ts(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| CareBridgeError::Database(format!("timestamp out of range: {secs}")))
}

/// Run a blocking database closure on the tokio blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CareBridgeError::Internal(format!("blocking task panicked: {e}")))?
}
