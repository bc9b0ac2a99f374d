//! Ouroboros control-plane daemon — serves the Control API and runs the
//! resource cleanup loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use ob_bridge::http_api::api_router;
use ob_bridge::{workers, ApiState};
use ob_core::config::Settings;
use ob_core::events::{event_bus, topics, EventBus};
use ob_db::Db;
use ob_storage::{DynObjectStore, S3ObjectStore};

mod shutdown;

use shutdown::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    ob_telemetry::logging::init_logging("ob-daemon", "info");

    let settings = Settings::from_env();
    info!(bind_addr = %settings.bind_addr, "ouroboros daemon starting");

    let db = Db::connect(&settings.database_url)
        .await
        .context("failed to connect to database")?;
    let storage: DynObjectStore = Arc::new(
        S3ObjectStore::connect(&settings.storage_endpoint, &settings.storage_bucket).await,
    );

    let bus = event_bus();
    register_audit_handlers(bus).await;

    let shutdown = ShutdownSignal::new();

    // Ctrl-C triggers the coordinated shutdown.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.trigger();
            }
        });
    }

    // The stale-resource reaper runs for the life of the process.
    tokio::spawn(workers::run_periodic_cleanup(
        db.clone(),
        storage.clone(),
        settings.clone(),
        shutdown.subscribe(),
    ));

    let state = Arc::new(ApiState::new(db, storage, bus, settings.clone()));
    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "control api listening");

    let mut shutdown_rx = shutdown.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("http server draining");
        })
        .await
        .context("http server failed")?;

    info!("ouroboros daemon stopped");
    Ok(())
}

/// Default subscriptions: an audit trail for the lifecycle topics agents and
/// operators care about most.
async fn register_audit_handlers(bus: &'static EventBus) {
    bus.subscribe(topics::HASH_CRACKED, "audit_hash_cracked", |payload| async move {
        info!(
            hash_list_id = payload["hash_list_id"].as_i64().unwrap_or_default(),
            "hash cracked"
        );
        Ok(())
    })
    .await;

    bus.subscribe(
        topics::CAMPAIGN_STARTED,
        "audit_campaign_started",
        |payload| async move {
            info!(
                campaign_id = payload["campaign_id"].as_i64().unwrap_or_default(),
                "campaign started"
            );
            Ok(())
        },
    )
    .await;

    bus.subscribe(
        topics::CAMPAIGN_COMPLETED,
        "audit_campaign_completed",
        |payload| async move {
            info!(
                campaign_id = payload["campaign_id"].as_i64().unwrap_or_default(),
                "campaign completed"
            );
            Ok(())
        },
    )
    .await;

    bus.subscribe(
        topics::RESOURCE_UPLOADED,
        "audit_resource_uploaded",
        |payload| async move {
            info!(
                resource_id = payload["resource_id"].as_str().unwrap_or_default(),
                "resource uploaded"
            );
            Ok(())
        },
    )
    .await;
}
