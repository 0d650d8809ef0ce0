//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use carebridge_core::{
    EmrClient, MedicationService, PaginationEngine, SyncOrchestrator, SyncPolicy, SyncRunStore,
    TokenLifecycleManager,
};
use carebridge_domain::{Config, Result};
use carebridge_infra::{
    DbManager, ElationOAuthProvider, HttpEmrTransport, OAuthSettings, SqliteCredentialStore,
    SqliteMedicationStore, SqliteSyncRunStore, TransportSettings,
};

use crate::auth::IdentityProvider;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub tokens: Arc<TokenLifecycleManager>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub medications: Arc<MedicationService>,
    pub sync_runs: Arc<dyn SyncRunStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Principal scheduled/headless syncs run under
    pub sync_principal_id: String,
}

impl AppContext {
    /// Wire the full dependency graph from configuration.
    ///
    /// Opens the database, runs migrations, and assembles the EMR stack
    /// (transport, OAuth provider, token lifecycle, pagination, orchestrator)
    /// plus the audited medication service.
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        sync_principal_id: String,
    ) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let credentials = Arc::new(SqliteCredentialStore::new(Arc::clone(&db)));
        let oauth = Arc::new(ElationOAuthProvider::new(OAuthSettings::from_config(&config.emr))?);
        let tokens = Arc::new(TokenLifecycleManager::new(credentials, oauth));

        let transport = Arc::new(HttpEmrTransport::new(TransportSettings::from_config(&config.emr))?);
        let client = Arc::new(EmrClient::new(transport, Arc::clone(&tokens) as _));
        let pages = Arc::new(PaginationEngine::new(
            client,
            Duration::from_millis(config.sync.page_delay_ms),
            config.sync.max_pages,
        ));

        let sync_runs: Arc<dyn SyncRunStore> = Arc::new(SqliteSyncRunStore::new(Arc::clone(&db)));
        let policy = SyncPolicy {
            overall_timeout: config.sync.overall_timeout_secs.map(Duration::from_secs),
        };
        let orchestrator =
            Arc::new(SyncOrchestrator::new(pages, Arc::clone(&sync_runs), policy));

        let medications = Arc::new(MedicationService::new(Arc::new(SqliteMedicationStore::new(
            Arc::clone(&db),
        ))));

        Ok(Self {
            config,
            db,
            tokens,
            orchestrator,
            medications,
            sync_runs,
            identity,
            sync_principal_id,
        })
    }
}
