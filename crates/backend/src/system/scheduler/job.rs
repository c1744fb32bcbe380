use chrono::Utc;
use contracts::domain::a009_sync_schedule::SyncType;
use contracts::sync::{Credentials, SyncConfig};
use uuid::Uuid;

use crate::domain::{a001_network, a002_network_connection, a010_sync_log};
use crate::sync::limits::PlanLimitService;
use crate::sync::service::NetworkRegistry;

/// One unit of work handed from the schedule pass to the worker pool.
/// The log row already exists in Pending by the time a job is queued.
#[derive(Debug, Clone)]
pub struct SyncJobRequest {
    pub sync_log_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub user_id: Uuid,
    pub network_id: Uuid,
    pub sync_type: SyncType,
}

/// Run one job end to end. A failed sync is an outcome recorded on the
/// log, not an error; only log bookkeeping faults bubble up.
pub async fn run_job(
    request: &SyncJobRequest,
    registry: &NetworkRegistry,
    limits: &PlanLimitService,
) -> anyhow::Result<()> {
    let mut log = a010_sync_log::repository::get_by_id(request.sync_log_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("sync log {} not found", request.sync_log_id))?;

    log.mark_running().map_err(anyhow::Error::msg)?;
    log.before_write();
    a010_sync_log::repository::update(&log).await?;

    match execute(request, registry, limits).await {
        Ok(message) => {
            tracing::info!("Sync job {} finished: {}", log.base.code, message);
            log.mark_success().map_err(anyhow::Error::msg)?;
        }
        Err(message) => {
            tracing::warn!("Sync job {} failed: {}", log.base.code, message);
            log.mark_failed(message).map_err(anyhow::Error::msg)?;
        }
    }
    log.before_write();
    a010_sync_log::repository::update(&log).await?;
    Ok(())
}

/// Resolve the connection and protocol service for one job, then hand
/// off to the gated dispatch. The Err string becomes the log's
/// error_message verbatim.
async fn execute(
    request: &SyncJobRequest,
    registry: &NetworkRegistry,
    limits: &PlanLimitService,
) -> Result<String, String> {
    let connection =
        a002_network_connection::repository::get_by_user_and_network(
            request.user_id,
            request.network_id,
        )
        .await
        .map_err(|e| format!("connection lookup: {}", e))?
        .ok_or("No connection configured for this network")?;
    if !connection.is_active {
        return Err("Connection is inactive".into());
    }

    let network = a001_network::repository::get_by_id(request.network_id)
        .await
        .map_err(|e| format!("network lookup: {}", e))?
        .ok_or("Unknown network")?;
    let service = registry
        .get(&network.slug)
        .ok_or_else(|| format!("No protocol client for network '{}'", network.slug))?;

    let credentials = Credentials::new(connection.email.clone(), connection.password.clone());
    let config = SyncConfig {
        store: true,
        network_id: Some(request.network_id),
        user_id: Some(request.user_id),
        ..Default::default()
    };

    gate_and_dispatch(
        limits,
        service.as_ref(),
        request.user_id,
        &credentials,
        &config,
        Utc::now(),
    )
    .await
}

/// Admission control immediately followed by the protocol dispatch and
/// usage booking. A rejected gate returns before the network service
/// sees the request, so no transport call is ever made for it.
async fn gate_and_dispatch(
    limits: &PlanLimitService,
    service: &dyn crate::sync::service::NetworkService,
    user_id: Uuid,
    credentials: &Credentials,
    config: &SyncConfig,
    now: chrono::DateTime<Utc>,
) -> Result<String, String> {
    limits
        .assert_can_sync(user_id, now)
        .await
        .map_err(|e| e.to_string())?;
    limits
        .assert_within_sync_window(user_id, now)
        .await
        .map_err(|e| e.to_string())?;

    let result = service.sync_data(credentials, config).await;
    if !result.success {
        return Err(result.message);
    }

    if let Some(data) = &result.data {
        limits
            .record_usage(user_id, data.revenue_affiliate, data.purchases)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(result.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::limits::testing::MemoryLimitsStore;
    use crate::sync::networks::omolaat::client::OmolaatClient;
    use crate::sync::networks::omolaat::codec::{AesGcmCodec, PayloadCodec};
    use crate::sync::networks::omolaat::service::OmolaatService;
    use crate::sync::transport::testing::FakeTransport;
    use contracts::domain::a006_plan::aggregate::Limit;
    use contracts::domain::a008_usage_window::aggregate::UsagePeriod;
    use serde_json::json;
    use std::sync::Arc;

    fn omolaat_service(transport: Arc<FakeTransport>) -> (OmolaatService, Arc<AesGcmCodec>) {
        let codec = Arc::new(AesGcmCodec::from_passphrase("test-secret"));
        let client = OmolaatClient::new(
            transport,
            codec.clone(),
            "https://app.omolaat.example".into(),
        );
        (OmolaatService::new(client), codec)
    }

    fn limited_store(user_id: Uuid, sync_count: i64) -> Arc<MemoryLimitsStore> {
        let mut plan = MemoryLimitsStore::base_plan();
        plan.daily_sync_limit = Limit::Max(100);
        let store = Arc::new(MemoryLimitsStore::with_plan(plan, user_id));
        store.set_counts(UsagePeriod::Daily, user_id, sync_count);
        store
    }

    #[tokio::test]
    async fn exhausted_plan_rejects_before_any_transport_call() {
        let user_id = Uuid::new_v4();
        let limits = PlanLimitService::new(limited_store(user_id, 100));

        let transport = Arc::new(FakeTransport::new());
        let (service, _) = omolaat_service(transport.clone());

        let err = gate_and_dispatch(
            &limits,
            &service,
            user_id,
            &Credentials::new("user@example.com", "pw"),
            &SyncConfig::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(err.contains("Daily sync limit"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn an_admitted_job_syncs_then_books_usage() {
        let user_id = Uuid::new_v4();
        let store = limited_store(user_id, 99);
        let limits = PlanLimitService::new(store.clone());

        let transport = Arc::new(FakeTransport::new());
        let (service, codec) = omolaat_service(transport.clone());

        transport.push_with_cookies(
            200,
            r#"<html><head><meta name="csrf-token" content="tok-abc123"></head></html>"#,
            &["landing=1; Path=/"],
        );
        transport.push_with_cookies(200, "{}", &["sess=abc; HttpOnly"]);
        transport.push_ok("{}");
        transport.push_with_cookies(302, "", &["svc_live_umain=f81ad|USER_12345|web; Path=/"]);
        let hits = json!([
            {"_source": {"campaign_id": "c1", "coupon_code": "SAVE10", "order_id": "o-1",
                         "affiliate_amount": 5.0, "order_amount": 50.0}},
            {"_source": {"campaign_id": "c1", "coupon_code": "SAVE10", "order_id": "o-2",
                         "affiliate_amount": 10.0, "order_amount": 100.0}},
        ]);
        let page = json!({"responses": [{"hits": {"hits": hits}}]});
        transport.push_ok(&codec.encrypt(&page.to_string()).unwrap());
        let empty = json!({"responses": [{"hits": {"hits": []}}]});
        transport.push_ok(&codec.encrypt(&empty.to_string()).unwrap());

        let message = gate_and_dispatch(
            &limits,
            &service,
            user_id,
            &Credentials::new("user@example.com", "pw"),
            &SyncConfig::default(),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(message, "Synced 2 records");
        assert_eq!(transport.call_count(), 6);
        // One sync booked, commission and purchase count attached
        assert_eq!(*store.usage_added.lock().unwrap(), vec![(1, 15.0, 2)]);
    }
}
