//! EMR synchronization types.
//!
//! The entity catalog, the classified response wrapper produced by the EMR
//! client, the normalized page shape used by the pagination engine, and the
//! aggregate report produced by a full sync pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CareBridgeError, Result};

/// Synthetic status used when a request never produced an HTTP response
/// (timeout, DNS failure, connection refused). Distinguishes network-level
/// failures from provider 4xx/5xx in logs and sync reports.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// The fixed catalog of EMR entity collections replicated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmrEntity {
    Patients,
    Physicians,
    Practices,
    Appointments,
    AppointmentTypes,
    Allergies,
    Medications,
    MedicationOrders,
    Problems,
    Histories,
    Immunizations,
    Vaccines,
    LabOrders,
    LabReports,
    Vitals,
    Documents,
    VisitNotes,
    NonVisitNotes,
    Letters,
    Messages,
    Threads,
    Insurances,
    ServiceLocations,
    Bills,
}

impl EmrEntity {
    /// Every entity type, in the order a full sync visits them.
    pub const ALL: [Self; 24] = [
        Self::Patients,
        Self::Physicians,
        Self::Practices,
        Self::Appointments,
        Self::AppointmentTypes,
        Self::Allergies,
        Self::Medications,
        Self::MedicationOrders,
        Self::Problems,
        Self::Histories,
        Self::Immunizations,
        Self::Vaccines,
        Self::LabOrders,
        Self::LabReports,
        Self::Vitals,
        Self::Documents,
        Self::VisitNotes,
        Self::NonVisitNotes,
        Self::Letters,
        Self::Messages,
        Self::Threads,
        Self::Insurances,
        Self::ServiceLocations,
        Self::Bills,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Physicians => "physicians",
            Self::Practices => "practices",
            Self::Appointments => "appointments",
            Self::AppointmentTypes => "appointment_types",
            Self::Allergies => "allergies",
            Self::Medications => "medications",
            Self::MedicationOrders => "medication_orders",
            Self::Problems => "problems",
            Self::Histories => "histories",
            Self::Immunizations => "immunizations",
            Self::Vaccines => "vaccines",
            Self::LabOrders => "lab_orders",
            Self::LabReports => "lab_reports",
            Self::Vitals => "vitals",
            Self::Documents => "documents",
            Self::VisitNotes => "visit_notes",
            Self::NonVisitNotes => "non_visit_notes",
            Self::Letters => "letters",
            Self::Messages => "messages",
            Self::Threads => "threads",
            Self::Insurances => "insurances",
            Self::ServiceLocations => "service_locations",
            Self::Bills => "bills",
        }
    }

    /// Resource path of the collection endpoint, relative to the API base.
    pub fn path(self) -> String {
        format!("/{}/", self.as_str())
    }
}

impl std::fmt::Display for EmrEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified outcome of one EMR API call.
///
/// Non-2xx responses are carried here with `ok = false` instead of being
/// returned as errors, so callers can branch on status codes without
/// unwinding an in-progress sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmrResponse {
    pub ok: bool,
    /// HTTP status, or [`TRANSPORT_FAILURE_STATUS`] for network-level failures
    pub status: u16,
    pub data: Value,
}

impl EmrResponse {
    pub fn success(status: u16, data: Value) -> Self {
        Self { ok: true, status, data }
    }

    pub fn failure(status: u16, data: Value) -> Self {
        Self { ok: false, status, data }
    }

    pub fn transport_failure(detail: impl Into<String>) -> Self {
        Self { ok: false, status: TRANSPORT_FAILURE_STATUS, data: Value::String(detail.into()) }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE_STATUS
    }

    /// True when the provider rejected our credentials outright.
    pub fn is_auth_failure(&self) -> bool {
        status_is_auth_rejection(self.status)
    }
}

/// The one definition of "the provider rejected our credentials".
fn status_is_auth_rejection(status: u16) -> bool {
    status == 401 || status == 403
}

/// One decoded page of an entity collection.
///
/// Providers answer in one of three shapes: a `{results: [...], next: ...}`
/// envelope, a bare array, or a bare object for singleton resources. Anything
/// else is rejected as a decode error rather than guessed at.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Value>,
    /// Provider-supplied pointer to the next page, absent on the last page
    pub next: Option<String>,
}

impl RecordPage {
    pub fn decode(body: &Value) -> Result<Self> {
        match body {
            Value::Object(map) if map.contains_key("results") => {
                let records = match &map["results"] {
                    Value::Array(items) => items.clone(),
                    other => {
                        return Err(CareBridgeError::Validation(format!(
                            "results field is not an array (got {})",
                            type_name(other)
                        )))
                    }
                };
                let next = match map.get("next") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(url)) => Some(url.clone()),
                    Some(other) => {
                        return Err(CareBridgeError::Validation(format!(
                            "next pointer is not a string (got {})",
                            type_name(other)
                        )))
                    }
                };
                Ok(Self { records, next })
            }
            Value::Array(items) => Ok(Self { records: items.clone(), next: None }),
            Value::Object(_) => Ok(Self { records: vec![body.clone()], next: None }),
            other => Err(CareBridgeError::Validation(format!(
                "unrecognized page shape (got {})",
                type_name(other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why a pagination run stopped early.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageFailure {
    /// Page number (1-based) that failed
    pub page: u32,
    /// HTTP status, or [`TRANSPORT_FAILURE_STATUS`]
    pub status: u16,
    pub detail: String,
}

impl PageFailure {
    /// Same credential-rejection test as [`EmrResponse::is_auth_failure`].
    pub fn is_auth_failure(&self) -> bool {
        status_is_auth_rejection(self.status)
    }
}

/// Per-entity status inside a sync report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

/// Outcome of synchronizing one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySyncOutcome {
    pub entity: EmrEntity,
    pub status: SyncStatus,
    pub pages_fetched: u32,
    pub records_fetched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PageFailure>,
}

/// Aggregate result of a full catalog sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub requested_at: DateTime<Utc>,
    pub entities: Vec<EntitySyncOutcome>,
    pub overall: SyncStatus,
}

impl SyncReport {
    /// Aggregate: success iff all succeeded, failed iff none did.
    /// Entities that stopped early with records accumulated count toward
    /// "some succeeded" for the partial classification.
    pub fn aggregate(requested_at: DateTime<Utc>, entities: Vec<EntitySyncOutcome>) -> Self {
        let total = entities.len();
        let failures =
            entities.iter().filter(|outcome| outcome.status == SyncStatus::Failed).count();
        let clean =
            entities.iter().filter(|outcome| outcome.status == SyncStatus::Success).count();

        let overall = if total == 0 || clean == total {
            SyncStatus::Success
        } else if failures == total {
            SyncStatus::Failed
        } else {
            SyncStatus::Partial
        };

        Self { requested_at, entities, overall }
    }

    /// True when every entity failed because the provider rejected our
    /// credentials; the caller should surface a reauthorization hint.
    pub fn all_auth_failures(&self) -> bool {
        !self.entities.is_empty()
            && self.entities.iter().all(|outcome| {
                outcome.status == SyncStatus::Failed
                    && outcome.error.as_ref().is_some_and(PageFailure::is_auth_failure)
            })
    }
}

/// Persisted record of one entity-type sync attempt (observability).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: String,
    pub entity: EmrEntity,
    pub requested_at: DateTime<Utc>,
    pub pages_fetched: u32,
    pub records_fetched: usize,
    pub status: SyncStatus,
    pub error_detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_results_envelope() {
        let body = json!({"results": [{"id": 1}, {"id": 2}], "next": "https://emr/p2"});
        let page = RecordPage::decode(&body).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next.as_deref(), Some("https://emr/p2"));
    }

    #[test]
    fn decodes_envelope_with_null_next() {
        let body = json!({"results": [], "next": null});
        let page = RecordPage::decode(&body).unwrap();
        assert!(page.records.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn decodes_bare_array() {
        let body = json!([{"id": 1}]);
        let page = RecordPage::decode(&body).unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn decodes_bare_object_as_singleton() {
        let body = json!({"id": 7, "name": "singleton"});
        let page = RecordPage::decode(&body).unwrap();
        assert_eq!(page.records, vec![body]);
    }

    #[test]
    fn rejects_ambiguous_shapes() {
        assert!(RecordPage::decode(&json!("nope")).is_err());
        assert!(RecordPage::decode(&json!(42)).is_err());
        assert!(RecordPage::decode(&json!({"results": "not-a-list"})).is_err());
        assert!(RecordPage::decode(&json!({"results": [], "next": 3})).is_err());
    }

    fn outcome(entity: EmrEntity, status: SyncStatus) -> EntitySyncOutcome {
        let error = (status != SyncStatus::Success).then(|| PageFailure {
            page: 1,
            status: 500,
            detail: "boom".into(),
        });
        EntitySyncOutcome { entity, status, pages_fetched: 1, records_fetched: 0, error }
    }

    #[test]
    fn aggregate_truth_table() {
        let now = Utc::now();
        let all_ok = vec![
            outcome(EmrEntity::Allergies, SyncStatus::Success),
            outcome(EmrEntity::Medications, SyncStatus::Success),
        ];
        assert_eq!(SyncReport::aggregate(now, all_ok).overall, SyncStatus::Success);

        let mixed = vec![
            outcome(EmrEntity::Allergies, SyncStatus::Failed),
            outcome(EmrEntity::Medications, SyncStatus::Success),
        ];
        assert_eq!(SyncReport::aggregate(now, mixed).overall, SyncStatus::Partial);

        let all_bad = vec![
            outcome(EmrEntity::Allergies, SyncStatus::Failed),
            outcome(EmrEntity::Medications, SyncStatus::Failed),
        ];
        assert_eq!(SyncReport::aggregate(now, all_bad).overall, SyncStatus::Failed);

        let partial_entity = vec![
            outcome(EmrEntity::Allergies, SyncStatus::Partial),
            outcome(EmrEntity::Medications, SyncStatus::Success),
        ];
        assert_eq!(SyncReport::aggregate(now, partial_entity).overall, SyncStatus::Partial);
    }

    #[test]
    fn auth_failure_detection_requires_every_entity() {
        let now = Utc::now();
        let auth = |entity, status| EntitySyncOutcome {
            entity,
            status: SyncStatus::Failed,
            pages_fetched: 0,
            records_fetched: 0,
            error: Some(PageFailure { page: 1, status, detail: "rejected".into() }),
        };

        // 401 and 403 are both credential rejections, matching the response
        // classification.
        let report = SyncReport::aggregate(
            now,
            vec![auth(EmrEntity::Allergies, 401), auth(EmrEntity::Medications, 403)],
        );
        assert!(report.all_auth_failures());
        assert!(EmrResponse::failure(403, serde_json::Value::Null).is_auth_failure());

        let mixed = SyncReport::aggregate(
            now,
            vec![auth(EmrEntity::Allergies, 401), outcome(EmrEntity::Medications, SyncStatus::Failed)],
        );
        assert!(!mixed.all_auth_failures());
    }

    #[test]
    fn catalog_has_two_dozen_entries_with_unique_paths() {
        let mut paths: Vec<_> = EmrEntity::ALL.iter().map(|e| e.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), EmrEntity::ALL.len());
        assert_eq!(EmrEntity::Allergies.path(), "/allergies/");
    }
}
