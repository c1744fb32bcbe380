use contracts::sync::{Credentials, SyncError};
use serde_json::json;
use std::sync::Arc;

use crate::sync::transport::{HttpRequest, HttpTransport};

/// Protocol client for the Marketeers dashboard API.
///
/// Unlike the cookie-based networks this one issues a bearer token on
/// login and pages its coupon report by page number, starting at 1.
pub struct MarketeersClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl MarketeersClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: String) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, credentials: &Credentials) -> Result<String, SyncError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let request = HttpRequest::post(self.url("/api/auth/login"))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body.to_string());

        let response = self.transport.execute(request).await?;
        if response.status == 401 || response.status == 422 {
            return Err(SyncError::LoginFailed(login_error_message(&response.body)));
        }
        if !response.is_success() {
            return Err(SyncError::TransportError(format!(
                "login endpoint returned status {}",
                response.status
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| SyncError::MalformedResponse(format!("login body: {}", e)))?;
        match parsed.get("token").and_then(|t| t.as_str()) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(SyncError::MalformedResponse(
                "login body missing token".into(),
            )),
        }
    }

    /// One page of the coupon report. A 401 means the token aged out.
    pub async fn fetch_page(
        &self,
        token: &str,
        date_from: &str,
        date_to: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<serde_json::Value>, SyncError> {
        let url = format!(
            "{}?page={}&per_page={}&date_from={}&date_to={}",
            self.url("/api/reports/coupons"),
            page,
            per_page,
            date_from,
            date_to
        );
        let request = HttpRequest::get(url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json");

        let response = self.transport.execute(request).await?;
        if response.status == 401 || response.is_redirect() {
            return Err(SyncError::SessionExpired);
        }
        if !response.is_success() {
            return Err(SyncError::TransportError(format!(
                "coupon report returned status {}",
                response.status
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| SyncError::MalformedResponse(format!("report body: {}", e)))?;
        let rows = parsed
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SyncError::MalformedResponse("report body missing data array".into()))?;
        Ok(rows.clone())
    }

    /// Walk the report page by page until an empty page comes back
    pub async fn fetch_all(
        &self,
        token: &str,
        date_from: &str,
        date_to: &str,
        per_page: u32,
    ) -> Result<Vec<serde_json::Value>, SyncError> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let rows = self
                .fetch_page(token, date_from, date_to, page, per_page)
                .await?;
            if rows.is_empty() {
                break;
            }
            tracing::debug!("Marketeers page {}: {} rows", page, rows.len());
            all.extend(rows);
            page += 1;
        }
        Ok(all)
    }
}

fn login_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| "invalid credentials".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::transport::testing::FakeTransport;
    use crate::sync::transport::HttpResponse;
    use serde_json::json;

    fn client(transport: Arc<FakeTransport>) -> MarketeersClient {
        MarketeersClient::new(transport, "https://dash.marketeers.example".into())
    }

    fn row(code: &str) -> serde_json::Value {
        json!({"coupon": code, "advertiser_id": "a1"})
    }

    #[tokio::test]
    async fn login_returns_the_bearer_token() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(r#"{"token": "tok-xyz", "expires_in": 3600}"#);
        let client = client(transport.clone());

        let token = client
            .login(&Credentials::new("user@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(token, "tok-xyz");

        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://dash.marketeers.example/api/auth/login");
        assert!(calls[0].body.as_deref().unwrap().contains("user@example.com"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_a_failed_login() {
        let transport = Arc::new(FakeTransport::new());
        transport.push(HttpResponse {
            status: 401,
            headers: vec![],
            body: r#"{"message": "These credentials do not match our records."}"#.into(),
        });
        let client = client(transport);

        let err = client
            .login(&Credentials::new("user@example.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "login_failed");
        assert!(err.to_string().contains("do not match"));
    }

    #[tokio::test]
    async fn login_body_without_token_is_malformed() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(r#"{"status": "ok"}"#);
        let client = client(transport);

        let err = client
            .login(&Credentials::new("user@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "malformed_response");
    }

    #[tokio::test]
    async fn pages_start_at_one_and_stop_on_an_empty_page() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(&json!({"data": [row("A"), row("B")]}).to_string());
        transport.push_ok(&json!({"data": [row("C")]}).to_string());
        transport.push_ok(&json!({"data": []}).to_string());
        let client = client(transport.clone());

        let rows = client
            .fetch_all("tok", "2026-08-01", "2026-08-27", 50)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(transport.call_count(), 3);

        let calls = transport.calls();
        assert!(calls[0].url.contains("page=1"));
        assert!(calls[1].url.contains("page=2"));
        assert!(calls[2].url.contains("page=3"));
        assert!(calls[0]
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer tok"));
        assert!(calls[0].url.contains("date_from=2026-08-01"));
    }

    #[tokio::test]
    async fn expired_token_mid_fetch_is_a_session_error() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(&json!({"data": [row("A")]}).to_string());
        transport.push(HttpResponse {
            status: 401,
            headers: vec![],
            body: r#"{"message": "Unauthenticated."}"#.into(),
        });
        let client = client(transport);

        let err = client
            .fetch_all("tok", "2026-08-01", "2026-08-27", 50)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "session_expired");
    }
}
