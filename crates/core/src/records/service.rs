//! Medication mutation service.
//!
//! Every write goes through here so that validation, soft-delete visibility,
//! and audit pairing cannot be bypassed. The store commits each record write
//! together with its audit entry; this service decides what both contain.

use std::sync::Arc;

use carebridge_domain::{
    AuditAction, AuditEntry, CareBridgeError, Medication, MedicationInput, MedicationPatch,
    MedicationStatus, Result,
};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use super::ports::MedicationStore;

/// The authenticated clinician performing a mutation.
///
/// Both the stable id and the display identity are denormalized onto audit
/// entries so the trail stays readable after account changes.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub identity: String,
}

pub struct MedicationService {
    store: Arc<dyn MedicationStore>,
}

impl MedicationService {
    pub fn new(store: Arc<dyn MedicationStore>) -> Self {
        Self { store }
    }

    /// Create a medication. Audited with a full snapshot as `new_values` and
    /// no `previous_values`.
    #[instrument(skip(self, input, actor), fields(patient_id = %input.patient_id))]
    pub async fn create(&self, input: MedicationInput, actor: &Actor) -> Result<Medication> {
        if input.patient_id.trim().is_empty() {
            return Err(CareBridgeError::Validation("patient_id is required".into()));
        }
        if input.name.trim().is_empty() {
            return Err(CareBridgeError::Validation("medication name is required".into()));
        }

        let now = Utc::now();
        let record = Medication {
            id: Uuid::now_v7().to_string(),
            patient_id: input.patient_id,
            name: input.name,
            dosage: input.dosage,
            frequency: input.frequency,
            instructions: input.instructions,
            status: MedicationStatus::Active,
            discontinue_reason: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let audit = self.audit(&record, AuditAction::Create, actor, None, record.field_snapshot());
        self.store.apply(&record, &audit).await?;

        info!(medication_id = %record.id, "medication created");
        Ok(record)
    }

    /// One medication, hiding soft-deleted rows.
    pub async fn get(&self, id: &str) -> Result<Medication> {
        self.fetch_live(id).await
    }

    /// Non-deleted medications for a patient, newest first.
    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Medication>> {
        self.store.list_for_patient(patient_id).await
    }

    /// Apply a partial update.
    ///
    /// A patch that changes nothing returns the record untouched without
    /// writing or auditing; the trail records real changes only.
    #[instrument(skip(self, patch, actor))]
    pub async fn update(
        &self,
        id: &str,
        patch: &MedicationPatch,
        actor: &Actor,
    ) -> Result<Medication> {
        if patch.is_empty() {
            return Err(CareBridgeError::Validation("update patch has no fields".into()));
        }

        let mut record = self.fetch_live(id).await?;
        let (previous, current) = record.apply_patch(patch);
        if current.is_empty() {
            return Ok(record);
        }
        record.updated_at = Utc::now();

        let audit = self.audit(&record, AuditAction::Update, actor, Some(previous), current);
        self.store.apply(&record, &audit).await?;

        info!(medication_id = %record.id, "medication updated");
        Ok(record)
    }

    /// Discontinue a medication, recording the clinical reason.
    #[instrument(skip(self, actor))]
    pub async fn discontinue(&self, id: &str, reason: &str, actor: &Actor) -> Result<Medication> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CareBridgeError::Validation(
                "a discontinuation reason is required".into(),
            ));
        }

        let mut record = self.fetch_live(id).await?;
        let mut previous = Map::new();
        previous.insert("status".into(), Value::String(record.status.as_str().into()));
        previous.insert(
            "discontinue_reason".into(),
            record.discontinue_reason.clone().map_or(Value::Null, Value::String),
        );

        record.status = MedicationStatus::Discontinued;
        record.discontinue_reason = Some(reason.to_string());
        record.updated_at = Utc::now();

        let mut current = Map::new();
        current.insert("status".into(), Value::String(record.status.as_str().into()));
        current.insert("discontinue_reason".into(), Value::String(reason.to_string()));

        let audit = self.audit(&record, AuditAction::Discontinue, actor, Some(previous), current);
        self.store.apply(&record, &audit).await?;

        info!(medication_id = %record.id, "medication discontinued");
        Ok(record)
    }

    /// Soft-delete. The audit entry keeps a full field snapshot as
    /// `previous_values` so the trail preserves what was removed.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<()> {
        let mut record = self.fetch_live(id).await?;
        let snapshot = record.field_snapshot();

        record.is_deleted = true;
        record.updated_at = Utc::now();

        let mut current = Map::new();
        current.insert("is_deleted".into(), Value::Bool(true));

        let audit = self.audit(&record, AuditAction::Delete, actor, Some(snapshot), current);
        self.store.apply(&record, &audit).await?;

        info!(medication_id = %record.id, "medication deleted");
        Ok(())
    }

    /// Full audit trail for a record, oldest first. Available for deleted
    /// records too; the trail outlives its subject.
    pub async fn audit_trail(&self, id: &str) -> Result<Vec<AuditEntry>> {
        match self.store.find(id).await? {
            Some(_) => self.store.audit_trail(id).await,
            None => Err(CareBridgeError::NotFound(format!("medication {id}"))),
        }
    }

    async fn fetch_live(&self, id: &str) -> Result<Medication> {
        match self.store.find(id).await? {
            Some(record) if !record.is_deleted => Ok(record),
            // Soft-deleted rows are indistinguishable from absent ones here.
            _ => Err(CareBridgeError::NotFound(format!("medication {id}"))),
        }
    }

    fn audit(
        &self,
        record: &Medication,
        action: AuditAction,
        actor: &Actor,
        previous_values: Option<Map<String, Value>>,
        new_values: Map<String, Value>,
    ) -> AuditEntry {
        AuditEntry {
            id: Uuid::now_v7().to_string(),
            subject_record_id: record.id.clone(),
            action,
            actor_id: actor.id.clone(),
            actor_identity: actor.identity.clone(),
            previous_values,
            new_values,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// In-memory store honoring the atomic-apply contract, with a fault
    /// switch that rejects the whole apply (record and audit together).
    #[derive(Default)]
    struct MemoryStore {
        medications: Mutex<Vec<Medication>>,
        audits: Mutex<Vec<AuditEntry>>,
        fail_next_apply: AtomicBool,
    }

    #[async_trait]
    impl MedicationStore for MemoryStore {
        async fn find(&self, id: &str) -> Result<Option<Medication>> {
            Ok(self.medications.lock().unwrap().iter().find(|m| m.id == id).cloned())
        }

        async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Medication>> {
            let mut rows: Vec<_> = self
                .medications
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.patient_id == patient_id && !m.is_deleted)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn apply(&self, record: &Medication, audit: &AuditEntry) -> Result<()> {
            if self.fail_next_apply.swap(false, Ordering::SeqCst) {
                return Err(CareBridgeError::Database("disk full".into()));
            }
            let mut medications = self.medications.lock().unwrap();
            medications.retain(|m| m.id != record.id);
            medications.push(record.clone());
            self.audits.lock().unwrap().push(audit.clone());
            Ok(())
        }

        async fn audit_trail(&self, record_id: &str) -> Result<Vec<AuditEntry>> {
            Ok(self
                .audits
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.subject_record_id == record_id)
                .cloned()
                .collect())
        }
    }

    fn actor() -> Actor {
        Actor { id: "clin-1".into(), identity: "Dr. Okafor".into() }
    }

    fn input() -> MedicationInput {
        MedicationInput {
            patient_id: "pat-1".into(),
            name: "Lisinopril".into(),
            dosage: Some("10mg".into()),
            frequency: Some("daily".into()),
            instructions: None,
        }
    }

    fn service() -> (MedicationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (MedicationService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_audits_with_full_snapshot_and_no_previous() {
        let (service, store) = service();
        let med = service.create(input(), &actor()).await.unwrap();

        assert_eq!(med.status, MedicationStatus::Active);
        let audits = store.audits.lock().unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].action, AuditAction::Create);
        assert!(audits[0].previous_values.is_none());
        assert_eq!(audits[0].new_values["name"], json!("Lisinopril"));
        assert_eq!(audits[0].actor_identity, "Dr. Okafor");
    }

    #[tokio::test]
    async fn create_requires_patient_and_name() {
        let (service, _) = service();

        let mut no_patient = input();
        no_patient.patient_id = "  ".into();
        assert!(matches!(
            service.create(no_patient, &actor()).await,
            Err(CareBridgeError::Validation(_))
        ));

        let mut no_name = input();
        no_name.name = String::new();
        assert!(matches!(
            service.create(no_name, &actor()).await,
            Err(CareBridgeError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_audits_only_changed_fields() {
        let (service, store) = service();
        let med = service.create(input(), &actor()).await.unwrap();

        let patch = MedicationPatch { dosage: Some("20mg".into()), ..Default::default() };
        let updated = service.update(&med.id, &patch, &actor()).await.unwrap();
        assert_eq!(updated.dosage.as_deref(), Some("20mg"));

        let audits = store.audits.lock().unwrap();
        let entry = audits.last().unwrap();
        assert_eq!(entry.action, AuditAction::Update);
        let previous = entry.previous_values.as_ref().unwrap();
        assert_eq!(previous.len(), 1);
        assert_eq!(previous["dosage"], json!("10mg"));
        assert_eq!(entry.new_values["dosage"], json!("20mg"));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected_and_noop_patch_writes_nothing() {
        let (service, store) = service();
        let med = service.create(input(), &actor()).await.unwrap();

        assert!(matches!(
            service.update(&med.id, &MedicationPatch::default(), &actor()).await,
            Err(CareBridgeError::Validation(_))
        ));

        // Same values as stored: accepted, but nothing changes and no audit.
        let patch = MedicationPatch { name: Some("Lisinopril".into()), ..Default::default() };
        let unchanged = service.update(&med.id, &patch, &actor()).await.unwrap();
        assert_eq!(unchanged, med);
        assert_eq!(store.audits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn discontinue_requires_reason_and_records_it() {
        let (service, store) = service();
        let med = service.create(input(), &actor()).await.unwrap();

        assert!(matches!(
            service.discontinue(&med.id, "   ", &actor()).await,
            Err(CareBridgeError::Validation(_))
        ));

        let updated = service.discontinue(&med.id, "adverse reaction", &actor()).await.unwrap();
        assert_eq!(updated.status, MedicationStatus::Discontinued);
        assert_eq!(updated.discontinue_reason.as_deref(), Some("adverse reaction"));

        let audits = store.audits.lock().unwrap();
        let entry = audits.last().unwrap();
        assert_eq!(entry.action, AuditAction::Discontinue);
        assert_eq!(entry.previous_values.as_ref().unwrap()["status"], json!("active"));
        assert_eq!(entry.new_values["discontinue_reason"], json!("adverse reaction"));
    }

    #[tokio::test]
    async fn delete_hides_record_and_keeps_trail_readable() {
        let (service, store) = service();
        let med = service.create(input(), &actor()).await.unwrap();

        service.delete(&med.id, &actor()).await.unwrap();

        // Hidden from reads and further mutation.
        assert!(matches!(service.get(&med.id).await, Err(CareBridgeError::NotFound(_))));
        let patch = MedicationPatch { name: Some("x".into()), ..Default::default() };
        assert!(matches!(
            service.update(&med.id, &patch, &actor()).await,
            Err(CareBridgeError::NotFound(_))
        ));
        assert!(service.list_for_patient("pat-1").await.unwrap().is_empty());

        // Delete audit carries the full prior snapshot; trail still readable.
        let audits = store.audits.lock().unwrap();
        let entry = audits.last().unwrap();
        assert_eq!(entry.action, AuditAction::Delete);
        assert_eq!(entry.previous_values.as_ref().unwrap().len(), 5);
        assert_eq!(entry.new_values["is_deleted"], json!(true));
        drop(audits);

        let trail = service.audit_trail(&med.id).await.unwrap();
        assert_eq!(trail.len(), 2);
    }

    #[tokio::test]
    async fn double_delete_is_not_found() {
        let (service, _) = service();
        let med = service.create(input(), &actor()).await.unwrap();
        service.delete(&med.id, &actor()).await.unwrap();
        assert!(matches!(
            service.delete(&med.id, &actor()).await,
            Err(CareBridgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_apply_leaves_neither_record_nor_audit() {
        let (service, store) = service();
        let med = service.create(input(), &actor()).await.unwrap();

        store.fail_next_apply.store(true, Ordering::SeqCst);
        let patch = MedicationPatch { dosage: Some("40mg".into()), ..Default::default() };
        assert!(matches!(
            service.update(&med.id, &patch, &actor()).await,
            Err(CareBridgeError::Database(_))
        ));

        // Stored state and trail are both unchanged.
        let stored = service.get(&med.id).await.unwrap();
        assert_eq!(stored.dosage.as_deref(), Some("10mg"));
        assert_eq!(store.audits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn audit_trail_for_unknown_record_is_not_found() {
        let (service, _) = service();
        assert!(matches!(
            service.audit_trail("missing").await,
            Err(CareBridgeError::NotFound(_))
        ));
    }
}
