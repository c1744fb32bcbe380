use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use contracts::sync::{
    CouponData, CouponRecord, Credentials, SyncConfig, SyncError, SyncResult,
};
use serde_json::json;

use super::client::{LoginSession, OmolaatClient};
use crate::sync::persist;
use crate::sync::service::NetworkService;

pub struct OmolaatService {
    client: OmolaatClient,
}

impl OmolaatService {
    pub fn new(client: OmolaatClient) -> Self {
        Self { client }
    }

    async fn establish_session(
        &self,
        credentials: &Credentials,
    ) -> Result<LoginSession, SyncError> {
        if let Some(artifacts) = &credentials.session {
            if let Some(session) = LoginSession::from_artifacts(artifacts) {
                tracing::debug!("Reusing Omolaat session for user {}", session.user_id);
                return Ok(session);
            }
        }
        self.client.login(credentials).await
    }

    async fn run_sync(
        &self,
        credentials: &Credentials,
        config: &SyncConfig,
    ) -> Result<CouponData, SyncError> {
        credentials.validate()?;
        let session = self.establish_session(credentials).await?;

        let (from, to) = config.resolved_range(Utc::now().date_naive());
        let query = search_query(from, to, config.currency.as_deref());

        let hits = self
            .client
            .fetch_all(&session, &query, config.effective_page_size())
            .await?;

        let records: Vec<CouponRecord> = hits.iter().filter_map(normalize_hit).collect();
        let dropped = hits.len() - records.len();
        if dropped > 0 {
            tracing::warn!("Omolaat sync dropped {} malformed hits", dropped);
        }

        let mut data = CouponData::aggregate(records);
        data.user_id = Some(session.user_id.clone());
        data.session = Some(session.to_artifacts());

        if config.store {
            match (config.user_id, config.network_id) {
                (Some(user_id), Some(network_id)) => {
                    persist::store_coupon_data(&data, user_id, network_id)
                        .await
                        .map_err(|e| SyncError::TransportError(format!("store: {}", e)))?;
                }
                _ => {
                    return Err(SyncError::CredentialsInvalid(
                        "store requested without user_id and network_id".into(),
                    ))
                }
            }
        }

        Ok(data)
    }
}

#[async_trait]
impl NetworkService for OmolaatService {
    fn slug(&self) -> &str {
        "omolaat"
    }

    async fn test_connection(&self, credentials: &Credentials) -> SyncResult {
        if let Err(e) = credentials.validate() {
            return e.into();
        }
        match self.client.login(credentials).await {
            Ok(session) => {
                let mut data = CouponData::default();
                data.user_id = Some(session.user_id.clone());
                data.session = Some(session.to_artifacts());
                SyncResult::ok("Login successful", data)
            }
            Err(e) => {
                tracing::warn!("Omolaat connection test failed: {}", e);
                e.into()
            }
        }
    }

    async fn sync_data(&self, credentials: &Credentials, config: &SyncConfig) -> SyncResult {
        match self.run_sync(credentials, config).await {
            Ok(data) => {
                let message = format!("Synced {} records", data.total);
                SyncResult::ok(message, data)
            }
            Err(e) => {
                tracing::warn!("Omolaat sync failed: {}", e);
                e.into()
            }
        }
    }
}

fn search_query(from: NaiveDate, to: NaiveDate, currency: Option<&str>) -> serde_json::Value {
    let mut filters = vec![json!({
        "range": {"order_date": {
            "gte": from.format("%Y-%m-%d").to_string(),
            "lte": to.format("%Y-%m-%d").to_string(),
        }}
    })];
    if let Some(currency) = currency {
        filters.push(json!({"term": {"currency": currency}}));
    }
    json!({"query": {"bool": {"filter": filters}}, "sort": [{"order_date": "asc"}]})
}

/// Flatten one msearch hit into the common record schema. Hits without
/// the mandatory fields are dropped, not fatal.
fn normalize_hit(hit: &serde_json::Value) -> Option<CouponRecord> {
    let source = hit.get("_source")?;
    let campaign_id = string_field(source, "campaign_id")?;
    let code = string_field(source, "coupon_code")?;

    Some(CouponRecord {
        campaign_id,
        campaign_name: string_field(source, "campaign_name"),
        code,
        order_id: string_field(source, "order_id"),
        order_date: string_field(source, "order_date")
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        affiliate_amount: number_field(source, "affiliate_amount"),
        order_amount: number_field(source, "order_amount"),
        currency: string_field(source, "currency"),
        quantity: number_field(source, "quantity") as i32,
        status: string_field(source, "status"),
    })
}

fn string_field(source: &serde_json::Value, name: &str) -> Option<String> {
    match source.get(name)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Amounts arrive as numbers or numeric strings depending on the index
fn number_field(source: &serde_json::Value, name: &str) -> f64 {
    match source.get(name) {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
