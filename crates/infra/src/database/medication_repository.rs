//! SQLite-backed implementation of the MedicationStore port.
//!
//! The write path commits the medication row and its audit entry in one
//! transaction; partial writes cannot be observed.

use std::sync::Arc;

use async_trait::async_trait;
use carebridge_core::MedicationStore;
use carebridge_domain::{
    AuditAction, AuditEntry, CareBridgeError, Medication, MedicationStatus, Result,
};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::manager::{map_sql_error, DbManager};
use super::{datetime_from_ts, run_blocking};

/// SQLite implementation of MedicationStore
pub struct SqliteMedicationStore {
    db: Arc<DbManager>,
}

impl SqliteMedicationStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

const MEDICATION_COLUMNS: &str = "id, patient_id, name, dosage, frequency, instructions,
    status, discontinue_reason, is_deleted, created_at, updated_at";

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<(Medication, i64, i64, String)> {
    Ok((
        Medication {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            name: row.get(2)?,
            dosage: row.get(3)?,
            frequency: row.get(4)?,
            instructions: row.get(5)?,
            // Placeholder; replaced once the status string is parsed
            status: MedicationStatus::Active,
            discontinue_reason: row.get(7)?,
            is_deleted: row.get(8)?,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        },
        row.get(9)?,
        row.get(10)?,
        row.get(6)?,
    ))
}

fn finish_medication(
    (mut med, created_at, updated_at, status): (Medication, i64, i64, String),
) -> Result<Medication> {
    med.status = MedicationStatus::parse(&status)
        .ok_or_else(|| CareBridgeError::Database(format!("unknown medication status: {status}")))?;
    med.created_at = datetime_from_ts(created_at)?;
    med.updated_at = datetime_from_ts(updated_at)?;
    Ok(med)
}

fn values_from_json(text: Option<String>) -> Result<Option<Map<String, Value>>> {
    text.map(|t| {
        serde_json::from_str(&t)
            .map_err(|e| CareBridgeError::Database(format!("corrupt audit values: {e}")))
    })
    .transpose()
}

#[async_trait]
impl MedicationStore for SqliteMedicationStore {
    #[instrument(skip(self))]
    async fn find(&self, id: &str) -> Result<Option<Medication>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        run_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"),
                    params![id],
                    medication_from_row,
                )
                .optional()
                .map_err(map_sql_error)?;
            row.map(finish_medication).transpose()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Medication>> {
        let db = Arc::clone(&self.db);
        let patient_id = patient_id.to_string();

        run_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {MEDICATION_COLUMNS} FROM medications
                     WHERE patient_id = ?1 AND is_deleted = 0
                     ORDER BY created_at DESC, id DESC"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![patient_id], medication_from_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;

            rows.into_iter().map(finish_medication).collect()
        })
        .await
    }

    #[instrument(skip(self, record, audit), fields(medication_id = %record.id, action = audit.action.as_str()))]
    async fn apply(&self, record: &Medication, audit: &AuditEntry) -> Result<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();
        let audit = audit.clone();

        run_blocking(move || {
            let previous_json = audit
                .previous_values
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| CareBridgeError::Internal(format!("audit serialization: {e}")))?;
            let new_json = serde_json::to_string(&audit.new_values)
                .map_err(|e| CareBridgeError::Internal(format!("audit serialization: {e}")))?;

            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;

            tx.execute(
                "INSERT INTO medications (
                    id, patient_id, name, dosage, frequency, instructions,
                    status, discontinue_reason, is_deleted, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    dosage = excluded.dosage,
                    frequency = excluded.frequency,
                    instructions = excluded.instructions,
                    status = excluded.status,
                    discontinue_reason = excluded.discontinue_reason,
                    is_deleted = excluded.is_deleted,
                    updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.patient_id,
                    record.name,
                    record.dosage,
                    record.frequency,
                    record.instructions,
                    record.status.as_str(),
                    record.discontinue_reason,
                    record.is_deleted,
                    record.created_at.timestamp(),
                    record.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;

            tx.execute(
                "INSERT INTO audit_entries (
                    id, subject_record_id, action, actor_id, actor_identity,
                    previous_values, new_values, timestamp
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    audit.id,
                    audit.subject_record_id,
                    audit.action.as_str(),
                    audit.actor_id,
                    audit.actor_identity,
                    previous_json,
                    new_json,
                    audit.timestamp.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;

            debug!("medication write committed with audit entry");
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn audit_trail(&self, record_id: &str) -> Result<Vec<AuditEntry>> {
        let db = Arc::clone(&self.db);
        let record_id = record_id.to_string();

        run_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, subject_record_id, action, actor_id, actor_identity,
                            previous_values, new_values, timestamp
                     FROM audit_entries
                     WHERE subject_record_id = ?1
                     ORDER BY timestamp ASC, id ASC",
                )
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![record_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                })
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;

            rows.into_iter()
                .map(|(id, subject, action, actor_id, actor_identity, previous, new, ts)| {
                    Ok(AuditEntry {
                        id,
                        subject_record_id: subject,
                        action: AuditAction::parse(&action).ok_or_else(|| {
                            CareBridgeError::Database(format!("unknown audit action: {action}"))
                        })?,
                        actor_id,
                        actor_identity,
                        previous_values: values_from_json(previous)?,
                        new_values: values_from_json(Some(new))?.unwrap_or_default(),
                        timestamp: datetime_from_ts(ts)?,
                    })
                })
                .collect()
        })
        .await
    }
}
