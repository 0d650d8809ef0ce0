//! # CareBridge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The EMR synchronization engine (token lifecycle, client, pagination,
//!   orchestration)
//! - The audited mutation service for locally-owned clinical records
//! - Port/adapter interfaces (traits) implemented by `carebridge-infra`
//!
//! ## Architecture Principles
//! - Only depends on `carebridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod emr;
pub mod records;

// Re-export specific items to avoid ambiguity
pub use emr::client::{EmrClient, EmrMethod};
pub use emr::pagination::{PageHarvest, PaginationEngine};
pub use emr::ports::{
    AccessTokenSource, CredentialStore, EmrTransport, OAuthProvider, SyncRunStore,
};
pub use emr::sync::{SyncOrchestrator, SyncPolicy};
pub use emr::tokens::TokenLifecycleManager;
pub use records::ports::MedicationStore;
pub use records::service::{Actor, MedicationService};
