//! Full-catalog sync orchestration.

use std::sync::Arc;
use std::time::Duration;

use carebridge_domain::{
    EmrEntity, EntitySyncOutcome, PageFailure, SyncReport, SyncRun, SyncStatus,
    TRANSPORT_FAILURE_STATUS,
};
use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::pagination::PaginationEngine;
use super::ports::SyncRunStore;

/// Knobs for a full sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncPolicy {
    /// Wall-clock budget for the whole catalog; entities not started before
    /// the deadline are reported failed without touching the provider.
    pub overall_timeout: Option<Duration>,
}

/// Drives a full sync of the entity catalog, one entity type at a time.
///
/// Entities are independent: a failure in one never aborts the others. The
/// report aggregates per-entity outcomes and each attempt is persisted as a
/// [`SyncRun`] for later inspection.
pub struct SyncOrchestrator {
    pages: Arc<PaginationEngine>,
    runs: Arc<dyn SyncRunStore>,
    policy: SyncPolicy,
}

fn deadline_outcome(entity: EmrEntity, detail: &str) -> EntitySyncOutcome {
    EntitySyncOutcome {
        entity,
        status: SyncStatus::Failed,
        pages_fetched: 0,
        records_fetched: 0,
        error: Some(PageFailure {
            page: 0,
            status: TRANSPORT_FAILURE_STATUS,
            detail: detail.into(),
        }),
    }
}

impl SyncOrchestrator {
    pub fn new(pages: Arc<PaginationEngine>, runs: Arc<dyn SyncRunStore>, policy: SyncPolicy) -> Self {
        Self { pages, runs, policy }
    }

    /// Synchronize every entity in the catalog for `principal_id`.
    ///
    /// Sequential on purpose: the provider rate limit is shared across
    /// collections, so fanning out concurrently would just trade order for
    /// 429s. Never returns `Err`; the report carries all failure detail.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, principal_id: &str) -> SyncReport {
        let requested_at = Utc::now();
        let deadline = self.policy.overall_timeout.map(|budget| Instant::now() + budget);
        let mut outcomes = Vec::with_capacity(EmrEntity::ALL.len());

        for entity in EmrEntity::ALL {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|r| r.is_zero()) {
                outcomes.push(deadline_outcome(
                    entity,
                    "sync deadline exceeded before entity started",
                ));
                continue;
            }

            // The fetch itself runs under the remaining budget: on expiry the
            // in-flight walk is abandoned, not awaited further.
            let outcome = match remaining {
                Some(budget) => {
                    match tokio::time::timeout(budget, self.sync_entity(entity, principal_id))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(%entity, "entity fetch abandoned at sync deadline");
                            outcomes.push(deadline_outcome(
                                entity,
                                "sync deadline exceeded during entity fetch",
                            ));
                            continue;
                        }
                    }
                }
                None => self.sync_entity(entity, principal_id).await,
            };

            let run = SyncRun {
                id: Uuid::now_v7().to_string(),
                entity,
                requested_at,
                pages_fetched: outcome.pages_fetched,
                records_fetched: outcome.records_fetched,
                status: outcome.status,
                error_detail: outcome.error.as_ref().map(|f| f.detail.clone()),
            };
            // Observability only; a bookkeeping failure must not fail the sync.
            if let Err(err) = self.runs.record(&run).await {
                warn!(%entity, error = %err, "failed to persist sync run");
            }

            outcomes.push(outcome);
        }

        let report = SyncReport::aggregate(requested_at, outcomes);
        info!(
            overall = ?report.overall,
            entities = report.entities.len(),
            "catalog sync complete"
        );
        report
    }

    async fn sync_entity(&self, entity: EmrEntity, principal_id: &str) -> EntitySyncOutcome {
        let harvest = self.pages.fetch_all(&entity.path(), principal_id).await;

        let status = match &harvest.failure {
            None => SyncStatus::Success,
            Some(_) if !harvest.records.is_empty() => SyncStatus::Partial,
            Some(_) => SyncStatus::Failed,
        };

        if let Some(failure) = &harvest.failure {
            warn!(
                %entity,
                page = failure.page,
                status = failure.status,
                detail = %failure.detail,
                "entity sync stopped early"
            );
        }

        EntitySyncOutcome {
            entity,
            status,
            pages_fetched: harvest.pages_fetched,
            records_fetched: harvest.records.len(),
            error: harvest.failure,
        }
    }
}
