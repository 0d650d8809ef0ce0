//! # CareBridge Infrastructure
//!
//! Adapters behind the `carebridge-core` ports:
//! - SQLite persistence (credentials, medications, audit trail, sync runs)
//! - The EMR HTTP transport and OAuth provider (reqwest)
//! - Configuration loading
//! - The periodic sync scheduler

pub mod config;
pub mod database;
pub mod emr;
pub mod scheduling;

pub use config::loader::load_config;
pub use database::manager::DbManager;
pub use database::{
    SqliteCredentialStore, SqliteMedicationStore, SqliteSyncRunStore,
};
pub use emr::oauth::{ElationOAuthProvider, OAuthSettings};
pub use emr::transport::{HttpEmrTransport, TransportSettings};
pub use scheduling::sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
