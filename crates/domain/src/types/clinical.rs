//! Locally-owned clinical records and their audit trail.
//!
//! Medications are the first (and currently only) record type authored in
//! CareBridge itself rather than replicated from the EMR. Every mutation of
//! one of these rows is paired with exactly one [`AuditEntry`]; rows are
//! soft-deleted, never removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a medication order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationStatus {
    Active,
    OnHold,
    Discontinued,
    Completed,
}

impl MedicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Discontinued => "discontinued",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "on_hold" => Some(Self::OnHold),
            "discontinued" => Some(Self::Discontinued),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A medication record authored by a clinician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: String,
    /// Immutable foreign relationship; never changed after creation
    pub patient_id: String,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub status: MedicationStatus,
    /// Reason recorded when the medication was discontinued
    pub discontinue_reason: Option<String>,
    /// Soft-delete flag; deleted rows are invisible to the read path
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a medication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationInput {
    pub patient_id: String,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationPatch {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub status: Option<MedicationStatus>,
}

impl MedicationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.dosage.is_none()
            && self.frequency.is_none()
            && self.instructions.is_none()
            && self.status.is_none()
    }
}

impl Medication {
    /// Snapshot of the mutable clinical fields as a JSON map.
    ///
    /// Used for the `previous_values` of a delete audit entry and as the
    /// basis for update diffs.
    pub fn field_snapshot(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("dosage".into(), json_opt(&self.dosage));
        map.insert("frequency".into(), json_opt(&self.frequency));
        map.insert("instructions".into(), json_opt(&self.instructions));
        map.insert("status".into(), Value::String(self.status.as_str().into()));
        map
    }

    /// Apply `patch`, returning `(previous_values, new_values)` restricted to
    /// the fields that actually changed. Both maps are empty for a no-op
    /// patch.
    pub fn apply_patch(&mut self, patch: &MedicationPatch) -> (Map<String, Value>, Map<String, Value>) {
        let mut previous = Map::new();
        let mut current = Map::new();

        if let Some(name) = &patch.name {
            if *name != self.name {
                previous.insert("name".into(), Value::String(self.name.clone()));
                current.insert("name".into(), Value::String(name.clone()));
                self.name = name.clone();
            }
        }
        if let Some(dosage) = &patch.dosage {
            if Some(dosage) != self.dosage.as_ref() {
                previous.insert("dosage".into(), json_opt(&self.dosage));
                current.insert("dosage".into(), Value::String(dosage.clone()));
                self.dosage = Some(dosage.clone());
            }
        }
        if let Some(frequency) = &patch.frequency {
            if Some(frequency) != self.frequency.as_ref() {
                previous.insert("frequency".into(), json_opt(&self.frequency));
                current.insert("frequency".into(), Value::String(frequency.clone()));
                self.frequency = Some(frequency.clone());
            }
        }
        if let Some(instructions) = &patch.instructions {
            if Some(instructions) != self.instructions.as_ref() {
                previous.insert("instructions".into(), json_opt(&self.instructions));
                current.insert("instructions".into(), Value::String(instructions.clone()));
                self.instructions = Some(instructions.clone());
            }
        }
        if let Some(status) = patch.status {
            if status != self.status {
                previous.insert("status".into(), Value::String(self.status.as_str().into()));
                current.insert("status".into(), Value::String(status.as_str().into()));
                self.status = status;
            }
        }

        (previous, current)
    }
}

fn json_opt(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}

/// Kind of mutation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Discontinue,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Discontinue => "discontinue",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "discontinue" => Some(Self::Discontinue),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Append-only record of one clinical-record mutation.
///
/// `previous_values` is `None` only for `create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: String,
    pub subject_record_id: String,
    pub action: AuditAction,
    /// Stable actor identifier (account id)
    pub actor_id: String,
    /// Human-readable actor identity at the time of the action
    pub actor_identity: String,
    pub previous_values: Option<Map<String, Value>>,
    pub new_values: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}
