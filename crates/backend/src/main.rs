use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use backend::domain::a001_network;
use backend::shared::config::{get_database_path, load_config};
use backend::shared::data::db::initialize_database;
use backend::sync::limits::{DbLimitsStore, PlanLimitService};
use backend::sync::networks::build_registry;
use backend::system::scheduler::{RotationWorker, ScheduleWorker, SyncJobWorker};
use backend::system::tracing::initialize as initialize_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialize_tracing()?;

    let config = load_config()?;
    let db_path = get_database_path(&config)?;
    initialize_database(db_path.to_str()).await?;
    a001_network::service::seed_catalog().await?;

    let registry = Arc::new(
        build_registry(&config).map_err(|e| anyhow::anyhow!("network registry: {}", e))?,
    );
    tracing::info!("Protocol clients registered: {:?}", registry.slugs());

    let limits = Arc::new(PlanLimitService::new(Arc::new(DbLimitsStore)));

    let (tx, rx) = mpsc::channel(64);
    let rx = Arc::new(Mutex::new(rx));

    for index in 0..config.scheduler.worker_count.max(1) {
        let worker = SyncJobWorker::new(index, rx.clone(), registry.clone(), limits.clone());
        tokio::spawn(worker.run());
    }
    tokio::spawn(ScheduleWorker::new(config.scheduler.interval_seconds, tx).run());
    tokio::spawn(RotationWorker::new(config.scheduler.rotation_interval_seconds).run());

    tracing::info!("Sync engine running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
