//! SQLite-backed implementation of the SyncRunStore port.

use std::sync::Arc;

use async_trait::async_trait;
use carebridge_core::SyncRunStore;
use carebridge_domain::{CareBridgeError, EmrEntity, Result, SyncRun, SyncStatus};
use rusqlite::params;
use tracing::instrument;

use super::manager::{map_sql_error, DbManager};
use super::{datetime_from_ts, run_blocking};

/// SQLite implementation of SyncRunStore
pub struct SqliteSyncRunStore {
    db: Arc<DbManager>,
}

impl SqliteSyncRunStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn status_to_str(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Success => "success",
        SyncStatus::Partial => "partial",
        SyncStatus::Failed => "failed",
    }
}

fn status_from_str(value: &str) -> Result<SyncStatus> {
    match value {
        "success" => Ok(SyncStatus::Success),
        "partial" => Ok(SyncStatus::Partial),
        "failed" => Ok(SyncStatus::Failed),
        other => Err(CareBridgeError::Database(format!("unknown sync status: {other}"))),
    }
}

fn entity_from_str(value: &str) -> Result<EmrEntity> {
    EmrEntity::ALL
        .into_iter()
        .find(|entity| entity.as_str() == value)
        .ok_or_else(|| CareBridgeError::Database(format!("unknown sync entity: {value}")))
}

#[async_trait]
impl SyncRunStore for SqliteSyncRunStore {
    #[instrument(skip(self, run), fields(entity = %run.entity, status = status_to_str(run.status)))]
    async fn record(&self, run: &SyncRun) -> Result<()> {
        let db = Arc::clone(&self.db);
        let run = run.clone();

        run_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_runs (
                    id, entity, requested_at, pages_fetched, records_fetched,
                    status, error_detail
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run.id,
                    run.entity.as_str(),
                    run.requested_at.timestamp(),
                    run.pages_fetched,
                    run.records_fetched as i64,
                    status_to_str(run.status),
                    run.error_detail,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: usize) -> Result<Vec<SyncRun>> {
        let db = Arc::clone(&self.db);

        run_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, entity, requested_at, pages_fetched, records_fetched,
                            status, error_detail
                     FROM sync_runs
                     ORDER BY requested_at DESC, id DESC
                     LIMIT ?1",
                )
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                })
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;

            rows.into_iter()
                .map(|(id, entity, requested_at, pages, records, status, error_detail)| {
                    Ok(SyncRun {
                        id,
                        entity: entity_from_str(&entity)?,
                        requested_at: datetime_from_ts(requested_at)?,
                        pages_fetched: pages,
                        records_fetched: usize::try_from(records).unwrap_or(0),
                        status: status_from_str(&status)?,
                        error_detail,
                    })
                })
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn setup() -> (SqliteSyncRunStore, tempfile::TempDir) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(temp_dir.path().join("test.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (SqliteSyncRunStore::new(db), temp_dir)
    }

    fn run(entity: EmrEntity, minutes_ago: i64) -> SyncRun {
        SyncRun {
            id: Uuid::now_v7().to_string(),
            entity,
            requested_at: Utc::now() - Duration::minutes(minutes_ago),
            pages_fetched: 3,
            records_fetched: 120,
            status: SyncStatus::Success,
            error_detail: None,
        }
    }

    #[tokio::test]
    async fn records_and_lists_newest_first() {
        let (store, _temp) = setup();
        store.record(&run(EmrEntity::Patients, 10)).await.unwrap();
        store.record(&run(EmrEntity::Allergies, 1)).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].entity, EmrEntity::Allergies);
        assert_eq!(recent[1].entity, EmrEntity::Patients);
    }

    #[tokio::test]
    async fn limit_and_error_detail_round_trip() {
        let (store, _temp) = setup();
        let mut failed = run(EmrEntity::Bills, 0);
        failed.status = SyncStatus::Failed;
        failed.error_detail = Some("HTTP 503".into());
        store.record(&failed).await.unwrap();
        store.record(&run(EmrEntity::Patients, 5)).await.unwrap();

        let recent = store.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, SyncStatus::Failed);
        assert_eq!(recent[0].error_detail.as_deref(), Some("HTTP 503"));
    }
}
