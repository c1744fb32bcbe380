use contracts::sync::{CookieJar, Credentials, SessionArtifacts, SyncError};
use std::sync::Arc;

use super::codec::PayloadCodec;
use crate::sync::transport::{HttpRequest, HttpTransport};

/// Session state established by the login handshake
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub cookies: CookieJar,
    pub csrf_token: Option<String>,
    /// Numeric account id scraped out of the session cookie
    pub user_id: String,
}

impl LoginSession {
    /// Resume from artifacts a previous call handed back. Only complete
    /// artifacts qualify; anything less forces a fresh login.
    pub fn from_artifacts(artifacts: &SessionArtifacts) -> Option<Self> {
        let user_id = artifacts.user_id.clone()?;
        if artifacts.cookies.is_empty() {
            return None;
        }
        Some(Self {
            cookies: artifacts.cookies.clone(),
            csrf_token: artifacts.csrf_token.clone(),
            user_id,
        })
    }

    pub fn to_artifacts(&self) -> SessionArtifacts {
        SessionArtifacts {
            cookies: self.cookies.clone(),
            csrf_token: self.csrf_token.clone(),
            user_id: Some(self.user_id.clone()),
        }
    }
}

/// Protocol client for the Omolaat dashboard.
///
/// The service has no public API; the client drives the same endpoints
/// the browser does: a multi-step login handshake that accumulates
/// session cookies, then an offset-paginated msearch whose responses
/// arrive inside an encrypted envelope.
pub struct OmolaatClient {
    transport: Arc<dyn HttpTransport>,
    codec: Arc<dyn PayloadCodec>,
    base_url: String,
}

impl OmolaatClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        codec: Arc<dyn PayloadCodec>,
        base_url: String,
    ) -> Self {
        Self {
            transport,
            codec,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Four-step login handshake. Every response's cookies are merged
    /// into one jar; the handshake only counts as a login when the
    /// resulting jar identifies the account.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginSession, SyncError> {
        let mut jar = CookieJar::new();

        // Step 1: landing page, first cookies and the CSRF token
        let landing = self
            .transport
            .execute(HttpRequest::get(self.url("/")))
            .await?;
        jar.merge_set_cookie_lines(landing.set_cookie_lines());
        let csrf_token = scrape_csrf_token(&landing.body);

        // Step 2: session bootstrap
        let init = self
            .transport
            .execute(self.with_session(HttpRequest::get(self.url("/api/session/init")), &jar, &csrf_token))
            .await?;
        jar.merge_set_cookie_lines(init.set_cookie_lines());

        // Step 3: handshake ping the dashboard sends before any login
        let hello = self
            .transport
            .execute(self.with_session(
                HttpRequest::post(self.url("/api/session/hello")).body("{}"),
                &jar,
                &csrf_token,
            ))
            .await?;
        jar.merge_set_cookie_lines(hello.set_cookie_lines());

        // Step 4: credential post, form-encoded like the browser
        let form = format!(
            "email={}&password={}&_token={}",
            urlencoding::encode(&credentials.email),
            urlencoding::encode(&credentials.password),
            urlencoding::encode(csrf_token.as_deref().unwrap_or_default()),
        );
        let login = self
            .transport
            .execute(self.with_session(
                HttpRequest::post(self.url("/login"))
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(form),
                &jar,
                &csrf_token,
            ))
            .await?;
        if !login.is_success() && !login.is_redirect() {
            return Err(SyncError::TransportError(format!(
                "login endpoint returned status {}",
                login.status
            )));
        }
        jar.merge_set_cookie_lines(login.set_cookie_lines());

        // The handshake succeeded only if a cookie identifies the account
        let user_id = extract_user_id(&jar).ok_or_else(|| {
            SyncError::LoginFailed("handshake finished without a user_id session cookie".into())
        })?;

        tracing::debug!("Omolaat login established for user {}", user_id);
        Ok(LoginSession {
            cookies: jar,
            csrf_token,
            user_id,
        })
    }

    /// One msearch page at the given offset. The response body is an
    /// encrypted envelope; hits live at responses[0].hits.hits.
    pub async fn fetch_page(
        &self,
        session: &LoginSession,
        query: &serde_json::Value,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<serde_json::Value>, SyncError> {
        let url = format!(
            "{}?offset={}&limit={}",
            self.url("/api/search/msearch"),
            offset,
            page_size
        );
        let request = self
            .with_session(
                HttpRequest::post(url).header("Content-Type", "application/json"),
                &session.cookies,
                &session.csrf_token,
            )
            .body(query.to_string());

        let response = self.transport.execute(request).await?;
        if response.is_redirect() {
            return Err(SyncError::SessionExpired);
        }
        if !response.is_success() {
            return Err(SyncError::TransportError(format!(
                "msearch returned status {}",
                response.status
            )));
        }

        let plaintext = self.codec.decrypt(&response.body)?;
        let parsed: serde_json::Value = serde_json::from_str(&plaintext)
            .map_err(|e| SyncError::MalformedResponse(format!("msearch body: {}", e)))?;

        let hits = parsed
            .pointer("/responses/0/hits/hits")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SyncError::MalformedResponse("msearch body missing responses[0].hits.hits".into())
            })?;
        Ok(hits.clone())
    }

    /// Walk the offset pagination until the service reports an empty
    /// page. An empty page is the only stop condition; a short page
    /// still advances to the next offset.
    pub async fn fetch_all(
        &self,
        session: &LoginSession,
        query: &serde_json::Value,
        page_size: u32,
    ) -> Result<Vec<serde_json::Value>, SyncError> {
        let mut all = Vec::new();
        let mut offset = 0u32;
        loop {
            let hits = self.fetch_page(session, query, offset, page_size).await?;
            if hits.is_empty() {
                break;
            }
            tracing::debug!("Omolaat page at offset {}: {} hits", offset, hits.len());
            all.extend(hits);
            offset += page_size;
        }
        Ok(all)
    }

    fn with_session(
        &self,
        mut request: HttpRequest,
        jar: &CookieJar,
        csrf_token: &Option<String>,
    ) -> HttpRequest {
        if !jar.is_empty() {
            request = request.header("Cookie", jar.to_header_value());
        }
        if let Some(token) = csrf_token {
            request = request.header("X-CSRF-TOKEN", token.clone());
        }
        request
    }
}

/// Account id embedded pipe-delimited in a session cookie value, e.g.
/// "f81ad...|USER_12345|web". Returns the digits only.
pub fn extract_user_id(jar: &CookieJar) -> Option<String> {
    for (_, value) in jar.iter() {
        for segment in value.split('|') {
            if let Some(digits) = segment.strip_prefix("USER_") {
                if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                    return Some(digits.to_string());
                }
            }
        }
    }
    None
}

fn scrape_csrf_token(body: &str) -> Option<String> {
    let marker = body.find("name=\"csrf-token\"")?;
    let rest = &body[marker..];
    let content = rest.find("content=\"")? + "content=\"".len();
    let tail = &rest[content..];
    let end = tail.find('"')?;
    let token = &tail[..end];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::networks::omolaat::codec::AesGcmCodec;
    use crate::sync::transport::testing::FakeTransport;
    use crate::sync::transport::HttpResponse;
    use serde_json::json;

    const LANDING: &str =
        r#"<html><head><meta name="csrf-token" content="tok-abc123"></head></html>"#;

    fn client(transport: Arc<FakeTransport>) -> (OmolaatClient, Arc<AesGcmCodec>) {
        let codec = Arc::new(AesGcmCodec::from_passphrase("test-secret"));
        let client = OmolaatClient::new(
            transport,
            codec.clone(),
            "https://app.omolaat.example".into(),
        );
        (client, codec)
    }

    fn script_login(transport: &FakeTransport) {
        transport.push_with_cookies(200, LANDING, &["landing=1; Path=/"]);
        transport.push_with_cookies(200, "{}", &["sess=abc; HttpOnly"]);
        transport.push_ok("{}");
        transport.push_with_cookies(
            302,
            "",
            &["svc_live_umain=f81ad|USER_12345|web; Path=/; Secure"],
        );
    }

    fn msearch_body(codec: &AesGcmCodec, hits: &[serde_json::Value]) -> String {
        let payload = json!({"responses": [{"hits": {"hits": hits}}]});
        codec.encrypt(&payload.to_string()).unwrap()
    }

    fn hit(code: &str) -> serde_json::Value {
        json!({"_source": {"coupon_code": code, "campaign_id": "c1"}})
    }

    #[tokio::test]
    async fn login_accumulates_cookies_and_extracts_the_user_id() {
        let transport = Arc::new(FakeTransport::new());
        script_login(&transport);
        let (client, _) = client(transport.clone());

        let session = client
            .login(&Credentials::new("user@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(session.user_id, "12345");
        assert_eq!(session.csrf_token.as_deref(), Some("tok-abc123"));
        assert_eq!(session.cookies.len(), 3);
        assert_eq!(transport.call_count(), 4);

        // Cookies from step 1 ride along on step 2
        let calls = transport.calls();
        let step2_cookie = calls[1]
            .headers
            .iter()
            .find(|(k, _)| k == "Cookie")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(step2_cookie.contains("landing=1"));

        // The credential post is form-encoded and carries the CSRF token
        let step4 = &calls[3];
        assert!(step4.body.as_deref().unwrap().contains("_token=tok-abc123"));
        assert!(step4
            .headers
            .iter()
            .any(|(k, v)| k == "X-CSRF-TOKEN" && v == "tok-abc123"));
    }

    #[tokio::test]
    async fn handshake_without_identifying_cookie_is_a_failed_login() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_with_cookies(200, LANDING, &["landing=1"]);
        transport.push_ok("{}");
        transport.push_ok("{}");
        // All four steps answered, but no USER_ segment anywhere
        transport.push_with_cookies(302, "", &["svc_live_umain=f81ad|web; Path=/"]);
        let (client, _) = client(transport);

        let err = client
            .login(&Credentials::new("user@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "login_failed");
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn user_id_segment_must_be_numeric() {
        let mut jar = CookieJar::new();
        jar.insert("s", "a|USER_12x45|b");
        assert_eq!(extract_user_id(&jar), None);
        jar.insert("s", "a|USER_777|b");
        assert_eq!(extract_user_id(&jar), Some("777".into()));
    }

    fn session() -> LoginSession {
        let mut cookies = CookieJar::new();
        cookies.insert("svc_live_umain", "f81ad|USER_12345|web");
        LoginSession {
            cookies,
            csrf_token: Some("tok-abc123".into()),
            user_id: "12345".into(),
        }
    }

    #[tokio::test]
    async fn pagination_stops_only_on_an_empty_page() {
        let transport = Arc::new(FakeTransport::new());
        let (client, codec) = client(transport.clone());

        transport.push_ok(&msearch_body(&codec, &[hit("A"), hit("B")]));
        transport.push_ok(&msearch_body(&codec, &[]));

        let hits = client
            .fetch_all(&session(), &json!({"query": {}}), 100)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(transport.call_count(), 2);

        let calls = transport.calls();
        assert!(calls[0].url.contains("offset=0"));
        assert!(calls[1].url.contains("offset=100"));
    }

    #[tokio::test]
    async fn short_pages_do_not_stop_the_walk() {
        let transport = Arc::new(FakeTransport::new());
        let (client, codec) = client(transport.clone());

        // Two short pages, then the explicit empty page
        transport.push_ok(&msearch_body(&codec, &[hit("A"), hit("B")]));
        transport.push_ok(&msearch_body(&codec, &[hit("C"), hit("D")]));
        transport.push_ok(&msearch_body(&codec, &[]));

        let hits = client
            .fetch_all(&session(), &json!({"query": {}}), 100)
            .await
            .unwrap();
        assert_eq!(hits.len(), 4);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn redirect_mid_fetch_means_the_session_expired() {
        let transport = Arc::new(FakeTransport::new());
        let (client, codec) = client(transport.clone());

        transport.push_ok(&msearch_body(&codec, &[hit("A")]));
        transport.push(HttpResponse {
            status: 302,
            headers: vec![("location".into(), "/login".into())],
            body: String::new(),
        });

        let err = client
            .fetch_all(&session(), &json!({"query": {}}), 100)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "session_expired");
    }

    #[tokio::test]
    async fn undecryptable_envelope_is_a_decrypt_failure() {
        let transport = Arc::new(FakeTransport::new());
        let (client, _) = client(transport.clone());

        transport.push_ok("definitely-not-an-envelope");
        let err = client
            .fetch_page(&session(), &json!({}), 0, 100)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "decrypt_failed");
    }

    #[test]
    fn stale_artifacts_do_not_resume() {
        let artifacts = SessionArtifacts {
            cookies: CookieJar::new(),
            csrf_token: None,
            user_id: Some("12345".into()),
        };
        assert!(LoginSession::from_artifacts(&artifacts).is_none());

        let mut cookies = CookieJar::new();
        cookies.insert("svc_live_umain", "x|USER_12345|y");
        let artifacts = SessionArtifacts {
            cookies,
            csrf_token: None,
            user_id: Some("12345".into()),
        };
        assert!(LoginSession::from_artifacts(&artifacts).is_some());
    }
}
