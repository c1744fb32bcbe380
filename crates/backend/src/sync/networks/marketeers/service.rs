use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use contracts::sync::{
    CookieJar, CouponData, CouponRecord, Credentials, SessionArtifacts, SyncConfig, SyncError,
    SyncResult,
};

use super::client::MarketeersClient;
use crate::sync::persist;
use crate::sync::service::NetworkService;

/// Jar key the bearer token rides under when a session is handed back
const TOKEN_KEY: &str = "api_token";

pub struct MarketeersService {
    client: MarketeersClient,
}

impl MarketeersService {
    pub fn new(client: MarketeersClient) -> Self {
        Self { client }
    }

    async fn resolve_token(&self, credentials: &Credentials) -> Result<String, SyncError> {
        if let Some(artifacts) = &credentials.session {
            if let Some(token) = artifacts.cookies.get(TOKEN_KEY) {
                if !token.is_empty() {
                    tracing::debug!("Reusing Marketeers bearer token");
                    return Ok(token.to_string());
                }
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
        let token = self.resolve_token(credentials).await?;

        let (from, to) = config.resolved_range(Utc::now().date_naive());
        let rows = self
            .client
            .fetch_all(
                &token,
                &from.format("%Y-%m-%d").to_string(),
                &to.format("%Y-%m-%d").to_string(),
                config.effective_page_size(),
            )
            .await?;

        let records: Vec<CouponRecord> = rows.iter().filter_map(normalize_row).collect();
        let dropped = rows.len() - records.len();
        if dropped > 0 {
            tracing::warn!("Marketeers sync dropped {} malformed rows", dropped);
        }

        let mut data = CouponData::aggregate(records);
        data.session = Some(token_artifacts(&token));

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
impl NetworkService for MarketeersService {
    fn slug(&self) -> &str {
        "marketeers"
    }

    async fn test_connection(&self, credentials: &Credentials) -> SyncResult {
        if let Err(e) = credentials.validate() {
            return e.into();
        }
        match self.client.login(credentials).await {
            Ok(token) => {
                let mut data = CouponData::default();
                data.session = Some(token_artifacts(&token));
                SyncResult::ok("Login successful", data)
            }
            Err(e) => {
                tracing::warn!("Marketeers connection test failed: {}", e);
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
                tracing::warn!("Marketeers sync failed: {}", e);
                e.into()
            }
        }
    }
}

fn token_artifacts(token: &str) -> SessionArtifacts {
    let mut cookies = CookieJar::new();
    cookies.insert(TOKEN_KEY, token);
    SessionArtifacts {
        cookies,
        csrf_token: None,
        user_id: None,
    }
}

/// Map one report row onto the common record schema. The report uses
/// advertiser terminology where the engine says campaign.
fn normalize_row(row: &serde_json::Value) -> Option<CouponRecord> {
    let campaign_id = string_field(row, "advertiser_id")?;
    let code = string_field(row, "coupon")?;

    Some(CouponRecord {
        campaign_id,
        campaign_name: string_field(row, "advertiser_name"),
        code,
        order_id: string_field(row, "order_reference"),
        order_date: string_field(row, "date")
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        affiliate_amount: number_field(row, "commission"),
        order_amount: number_field(row, "order_value"),
        currency: string_field(row, "currency"),
        quantity: number_field(row, "quantity") as i32,
        status: string_field(row, "status"),
    })
}

fn string_field(row: &serde_json::Value, name: &str) -> Option<String> {
    match row.get(name)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(row: &serde_json::Value, name: &str) -> f64 {
    match row.get(name) {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::transport::testing::FakeTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn service(transport: Arc<FakeTransport>) -> MarketeersService {
        MarketeersService::new(MarketeersClient::new(
            transport,
            "https://dash.marketeers.example".into(),
        ))
    }

    fn order_row(code: &str, reference: &str, commission: f64, value: f64) -> serde_json::Value {
        json!({
            "advertiser_id": "adv-3",
            "advertiser_name": "Gadget Co",
            "coupon": code,
            "order_reference": reference,
            "date": "2026-08-20",
            "commission": commission,
            "order_value": value,
            "currency": "EUR",
            "quantity": 2,
            "status": "pending",
        })
    }

    #[tokio::test]
    async fn sync_logs_in_then_walks_the_report() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(r#"{"token": "tok-xyz"}"#);
        transport.push_ok(
            &json!({"data": [order_row("DEAL5", "r-1", 2.5, 25.0), order_row("DEAL9", "r-2", 4.0, 40.0)]})
                .to_string(),
        );
        transport.push_ok(&json!({"data": []}).to_string());
        let service = service(transport.clone());

        let result = service
            .sync_data(
                &Credentials::new("user@example.com", "pw"),
                &SyncConfig::default(),
            )
            .await;

        assert!(result.success, "{}", result.message);
        let data = result.data.unwrap();
        assert_eq!(data.total, 2);
        assert_eq!(data.coupons, 2);
        assert_eq!(data.campaigns, 1);
        assert_eq!(data.revenue_affiliate, 6.5);
        assert_eq!(data.revenue_order_amount, 65.0);
        // Login + one data page + the terminating empty page
        assert_eq!(transport.call_count(), 3);

        let session = data.session.unwrap();
        assert_eq!(session.cookies.get("api_token"), Some("tok-xyz"));
    }

    #[tokio::test]
    async fn a_handed_back_token_skips_the_login() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(&json!({"data": []}).to_string());
        let service = service(transport.clone());

        let credentials =
            Credentials::new("user@example.com", "pw").with_session(token_artifacts("tok-old"));
        let result = service.sync_data(&credentials, &SyncConfig::default()).await;

        assert!(result.success);
        assert_eq!(transport.call_count(), 1);
        let calls = transport.calls();
        assert!(calls[0]
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer tok-old"));
    }

    #[tokio::test]
    async fn test_connection_stops_at_the_token() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(r#"{"token": "tok-xyz"}"#);
        let service = service(transport.clone());

        let result = service
            .test_connection(&Credentials::new("user@example.com", "pw"))
            .await;
        assert!(result.success);
        assert_eq!(result.message, "Login successful");
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn advertiser_fields_map_onto_the_common_schema() {
        let record = normalize_row(&order_row("DEAL5", "r-1", 2.5, 25.0)).unwrap();
        assert_eq!(record.campaign_id, "adv-3");
        assert_eq!(record.campaign_name.as_deref(), Some("Gadget Co"));
        assert_eq!(record.code, "DEAL5");
        assert_eq!(record.order_id.as_deref(), Some("r-1"));
        assert_eq!(
            record.order_date,
            NaiveDate::from_ymd_opt(2026, 8, 20)
        );
        assert_eq!(record.quantity, 2);

        // Rows without the mandatory advertiser/coupon pair are dropped
        assert!(normalize_row(&json!({"coupon": "X"})).is_none());
    }
}
