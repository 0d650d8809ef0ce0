//! CareBridge - EMR synchronization and audited record engine
//!
//! Binary entry point: configuration, logging, context wiring, the periodic
//! sync scheduler, and the axum server.

use std::sync::Arc;
use std::time::Duration;

use carebridge_api::{router, AppContext, StaticTokenIdentity};
use carebridge_core::Actor;
use carebridge_domain::{CareBridgeError, Result};
use carebridge_infra::{load_config, SyncScheduler, SyncSchedulerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env file, using process environment"),
    }

    let config = load_config()?;

    // Single-operator identity; a multi-user deployment swaps this adapter
    // behind the IdentityProvider port.
    let operator_token = std::env::var("CAREBRIDGE_OPERATOR_TOKEN").map_err(|_| {
        CareBridgeError::Config("Missing required environment variable: CAREBRIDGE_OPERATOR_TOKEN".into())
    })?;
    let actor = Actor {
        id: std::env::var("CAREBRIDGE_OPERATOR_ID").unwrap_or_else(|_| "operator".into()),
        identity: std::env::var("CAREBRIDGE_OPERATOR_NAME").unwrap_or_else(|_| "Operator".into()),
    };
    let sync_principal_id = actor.id.clone();
    let identity = Arc::new(StaticTokenIdentity::new(operator_token, actor));

    let ctx = Arc::new(AppContext::new(config, identity, sync_principal_id)?);

    let mut scheduler = if ctx.config.sync.interval_secs > 0 {
        let mut scheduler = SyncScheduler::new(
            Arc::clone(&ctx.orchestrator),
            SyncSchedulerConfig {
                interval: Duration::from_secs(ctx.config.sync.interval_secs),
                principal_id: ctx.sync_principal_id.clone(),
            },
        );
        scheduler.start().await?;
        Some(scheduler)
    } else {
        info!("periodic sync disabled (interval is 0)");
        None
    };

    let bind_addr = ctx.config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| CareBridgeError::Config(format!("cannot bind {bind_addr}: {e}")))?;
    info!(%bind_addr, "CareBridge listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CareBridgeError::Internal(format!("server error: {e}")))?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.stop().await {
            warn!(error = %e, "sync scheduler did not stop cleanly");
        }
    }

    info!("CareBridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install ctrl-c handler; running until killed");
        std::future::pending::<()>().await;
    }
}
