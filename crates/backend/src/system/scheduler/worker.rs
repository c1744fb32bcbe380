use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use contracts::domain::a010_sync_log::SyncLog;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;

use super::job::{self, SyncJobRequest};
use crate::domain::{a009_sync_schedule, a010_sync_log};
use crate::sync::limits::PlanLimitService;
use crate::sync::service::NetworkRegistry;

/// Keeps a periodic pass from overlapping itself when one run takes
/// longer than the tick interval.
pub struct PassGuard {
    busy: AtomicBool,
}

impl PassGuard {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// True when the caller won the pass; end() must follow.
    pub fn begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Default for PassGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic pass over the schedule table: finds due schedules, opens one
/// Pending log per target network, queues the jobs, and moves each
/// schedule's trigger forward.
pub struct ScheduleWorker {
    interval_seconds: u64,
    tx: mpsc::Sender<SyncJobRequest>,
    guard: PassGuard,
}

impl ScheduleWorker {
    pub fn new(interval_seconds: u64, tx: mpsc::Sender<SyncJobRequest>) -> Self {
        Self {
            interval_seconds,
            tx,
            guard: PassGuard::new(),
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            self.interval_seconds.max(1),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            "Schedule worker started, pass every {}s",
            self.interval_seconds
        );

        loop {
            ticker.tick().await;
            if !self.guard.begin() {
                tracing::debug!("Previous schedule pass still running, skipping tick");
                continue;
            }
            if let Err(e) = self.process_due_pass().await {
                tracing::error!("Schedule pass failed: {}", e);
            }
            self.guard.end();
        }
    }

    async fn process_due_pass(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let schedules = a009_sync_schedule::repository::list_enabled().await?;

        for schedule in schedules {
            if !schedule.is_due(now) {
                continue;
            }

            let mut queued = 0usize;
            for network_id in &schedule.network_ids {
                let log = SyncLog::new_pending(
                    Some(schedule.base.id.value()),
                    schedule.user_id,
                    *network_id,
                    schedule.sync_type,
                );
                let log_id = a010_sync_log::repository::insert(&log).await?;

                let request = SyncJobRequest {
                    sync_log_id: log_id,
                    schedule_id: Some(schedule.base.id.value()),
                    user_id: schedule.user_id,
                    network_id: *network_id,
                    sync_type: schedule.sync_type,
                };
                if self.tx.send(request).await.is_err() {
                    anyhow::bail!("job queue closed");
                }
                queued += 1;
            }

            // One dispatch per schedule regardless of fan-out width
            let next_run_at = match a009_sync_schedule::service::compute_next_run(
                &schedule.frequency,
                now,
            ) {
                Ok(next) => Some(next),
                Err(e) => {
                    tracing::warn!(
                        "Schedule {} has unparseable frequency '{}': {}",
                        schedule.base.code,
                        schedule.frequency,
                        e
                    );
                    None
                }
            };
            a009_sync_schedule::repository::update_run_status(
                schedule.base.id.value(),
                next_run_at,
            )
            .await?;

            tracing::info!(
                "Schedule {} dispatched {} job(s), next run {:?}",
                schedule.base.code,
                queued,
                next_run_at
            );
        }
        Ok(())
    }
}

/// One member of the job pool. Workers share a single receiver so a slow
/// network only occupies one of them.
pub struct SyncJobWorker {
    index: usize,
    rx: Arc<Mutex<mpsc::Receiver<SyncJobRequest>>>,
    registry: Arc<NetworkRegistry>,
    limits: Arc<PlanLimitService>,
}

impl SyncJobWorker {
    pub fn new(
        index: usize,
        rx: Arc<Mutex<mpsc::Receiver<SyncJobRequest>>>,
        registry: Arc<NetworkRegistry>,
        limits: Arc<PlanLimitService>,
    ) -> Self {
        Self {
            index,
            rx,
            registry,
            limits,
        }
    }

    pub async fn run(self) {
        tracing::info!("Sync worker {} started", self.index);
        loop {
            let request = {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            };
            let Some(request) = request else {
                tracing::info!("Sync worker {} stopping, queue closed", self.index);
                break;
            };

            tracing::debug!(
                "Worker {} picked up job for log {}",
                self.index,
                request.sync_log_id
            );
            if let Err(e) = job::run_job(&request, &self.registry, &self.limits).await {
                tracing::error!(
                    "Worker {} could not complete log {}: {}",
                    self.index,
                    request.sync_log_id,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_admits_one_pass_at_a_time() {
        let guard = PassGuard::new();
        assert!(guard.begin());
        assert!(!guard.begin());
        guard.end();
        assert!(guard.begin());
    }

    fn request(schedule_id: uuid::Uuid, network_id: uuid::Uuid) -> SyncJobRequest {
        SyncJobRequest {
            sync_log_id: uuid::Uuid::new_v4(),
            schedule_id: Some(schedule_id),
            user_id: uuid::Uuid::new_v4(),
            network_id,
            sync_type: contracts::domain::a009_sync_schedule::SyncType::Full,
        }
    }

    #[tokio::test]
    async fn queued_requests_reach_a_single_consumer() {
        let (tx, rx) = mpsc::channel::<SyncJobRequest>(8);
        let rx = Arc::new(Mutex::new(rx));

        let sent = request(uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        tx.send(sent.clone()).await.unwrap();
        drop(tx);

        let received = rx.lock().await.recv().await.unwrap();
        assert_eq!(received.sync_log_id, sent.sync_log_id);
        assert!(rx.lock().await.recv().await.is_none());
    }

    #[tokio::test]
    async fn a_pass_in_flight_suppresses_the_next_dispatch() {
        let guard = PassGuard::new();
        let (tx, mut rx) = mpsc::channel::<SyncJobRequest>(8);
        let schedule_id = uuid::Uuid::new_v4();
        let network_id = uuid::Uuid::new_v4();

        // First tick wins the guard and is mid-dispatch for the due schedule
        assert!(guard.begin());
        tx.send(request(schedule_id, network_id)).await.unwrap();

        // Second tick fires while the first pass is still running: it must
        // skip dispatch entirely, not queue a duplicate for the same
        // schedule and network
        if guard.begin() {
            tx.send(request(schedule_id, network_id)).await.unwrap();
            guard.end();
        }
        guard.end();
        drop(tx);

        let mut queued = Vec::new();
        while let Some(r) = rx.recv().await {
            queued.push(r);
        }
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].schedule_id, Some(schedule_id));
    }
}
