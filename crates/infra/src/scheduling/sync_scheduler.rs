//! Periodic full-catalog sync scheduler.
//!
//! Interval-driven wrapper around the sync orchestrator with lifecycle
//! management. Fires the same code path as the HTTP sync triggers.

use std::sync::Arc;
use std::time::Duration;

use carebridge_core::SyncOrchestrator;
use carebridge_domain::{CareBridgeError, Result, SyncStatus};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Interval between full syncs
    pub interval: Duration,
    /// Principal whose EMR connection the scheduled sync runs under
    pub principal_id: String,
}

/// Periodic sync scheduler
pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, config: SyncSchedulerConfig) -> Self {
        Self {
            orchestrator,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that runs a full sync every interval.
    ///
    /// # Errors
    /// Returns an error if the scheduler is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(CareBridgeError::Internal("sync scheduler already running".into()));
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting sync scheduler");

        // New token each start so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let orchestrator = Arc::clone(&self.orchestrator);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(orchestrator, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// # Errors
    /// Returns an error if the scheduler is not running or the background
    /// task does not stop within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(CareBridgeError::Internal("sync scheduler not running".into()));
        }

        info!("Stopping sync scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| {
                    CareBridgeError::Internal("sync scheduler did not stop in time".into())
                })?
                .map_err(|e| CareBridgeError::Internal(format!("scheduler task panicked: {e}")))?;
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// A scheduler is running when it has an unfinished task handle.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn sync_loop(
        orchestrator: Arc<SyncOrchestrator>,
        config: SyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    let report = orchestrator.sync_all(&config.principal_id).await;
                    match report.overall {
                        SyncStatus::Success => {
                            debug!(entities = report.entities.len(), "scheduled sync succeeded");
                        }
                        overall => {
                            warn!(
                                ?overall,
                                reauthorization_needed = report.all_auth_failures(),
                                "scheduled sync did not complete cleanly"
                            );
                        }
                    }
                }
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        // Best-effort cleanup; stop() is the graceful path
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
