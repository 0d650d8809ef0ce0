//! Persistence port for medications and their audit trail.

use async_trait::async_trait;
use carebridge_domain::{AuditEntry, Medication, Result};

/// Trait for persisting medications and their audit entries.
///
/// `apply` is the only write path and must commit the record state and the
/// audit entry in one transaction: a stored mutation without its audit entry
/// (or the reverse) must be impossible.
#[async_trait]
pub trait MedicationStore: Send + Sync {
    /// Fetch one medication by id, including soft-deleted rows.
    /// Visibility filtering is the service's concern, not the store's.
    async fn find(&self, id: &str) -> Result<Option<Medication>>;

    /// Non-deleted medications for one patient, newest first
    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Medication>>;

    /// Atomically persist the record state and append its audit entry
    async fn apply(&self, record: &Medication, audit: &AuditEntry) -> Result<()>;

    /// Audit entries for one record, oldest first
    async fn audit_trail(&self, record_id: &str) -> Result<Vec<AuditEntry>>;
}
