//! # CareBridge Domain
//!
//! Business domain types and models for CareBridge.
//!
//! This crate contains:
//! - Domain data types (credentials, clinical records, sync reports)
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other CareBridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::{Config, DatabaseConfig, EmrConfig, ServerConfig, SyncConfig};
pub use errors::{CareBridgeError, Result};
pub use types::clinical::{
    AuditAction, AuditEntry, Medication, MedicationInput, MedicationPatch, MedicationStatus,
};
pub use types::credentials::{CredentialRecord, TokenGrant};
pub use types::sync::{
    EmrEntity, EmrResponse, EntitySyncOutcome, PageFailure, RecordPage, SyncReport, SyncRun,
    SyncStatus, TRANSPORT_FAILURE_STATUS,
};
