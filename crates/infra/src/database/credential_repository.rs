//! SQLite-backed implementation of the CredentialStore port.

use std::sync::Arc;

use async_trait::async_trait;
use carebridge_core::CredentialStore;
use carebridge_domain::{CredentialRecord, Result};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, instrument};

use super::manager::{map_sql_error, DbManager};
use super::{datetime_from_ts, run_blocking};

/// SQLite implementation of CredentialStore
pub struct SqliteCredentialStore {
    db: Arc<DbManager>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    #[instrument(skip(self))]
    async fn get(&self, provider: &str, principal_id: &str) -> Result<Option<CredentialRecord>> {
        let db = Arc::clone(&self.db);
        let provider = provider.to_string();
        let principal_id = principal_id.to_string();

        run_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    "SELECT provider, principal_id, access_token, refresh_token,
                            expires_at, token_type, scope, updated_at
                     FROM credentials
                     WHERE provider = ?1 AND principal_id = ?2",
                    params![provider, principal_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<i64>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<String>>(6)?,
                            row.get::<_, i64>(7)?,
                        ))
                    },
                )
                .optional()
                .map_err(map_sql_error)?;

            row.map(
                |(provider, principal_id, access_token, refresh_token, expires_at, token_type, scope, updated_at)| {
                    Ok(CredentialRecord {
                        provider,
                        principal_id,
                        access_token,
                        refresh_token,
                        expires_at: expires_at.map(datetime_from_ts).transpose()?,
                        token_type,
                        scope,
                        updated_at: datetime_from_ts(updated_at)?,
                    })
                },
            )
            .transpose()
        })
        .await
    }

    #[instrument(skip(self, record), fields(provider = %record.provider, principal_id = %record.principal_id))]
    async fn upsert(&self, record: &CredentialRecord) -> Result<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();

        run_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO credentials (
                    provider, principal_id, access_token, refresh_token,
                    expires_at, token_type, scope, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(provider, principal_id) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    expires_at = excluded.expires_at,
                    token_type = excluded.token_type,
                    scope = excluded.scope,
                    updated_at = excluded.updated_at",
                params![
                    record.provider,
                    record.principal_id,
                    record.access_token,
                    record.refresh_token,
                    record.expires_at.map(|t| t.timestamp()),
                    record.token_type,
                    record.scope,
                    record.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;

            debug!("credential stored");
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, provider: &str, principal_id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let provider = provider.to_string();
        let principal_id = principal_id.to_string();

        run_blocking(move || {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(
                    "DELETE FROM credentials WHERE provider = ?1 AND principal_id = ?2",
                    params![provider, principal_id],
                )
                .map_err(map_sql_error)?;
            debug!(removed, "credential delete");
            Ok(())
        })
        .await
    }
}
