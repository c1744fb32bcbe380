use async_trait::async_trait;
use contracts::sync::SyncError;

/// One outgoing HTTP call, independent of the client library behind it
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Redirects are observed, never followed; a login redirect
    /// mid-pagination means the session died
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All `Set-Cookie` lines, in response order
    pub fn set_cookie_lines(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Transport seam between protocol clients and the network. Production
/// uses reqwest; tests swap in a scripted fake.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SyncError>;
}

/// reqwest-backed transport with an explicit timeout and redirects off
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SyncError::TransportError(format!("client build failed: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SyncError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| SyncError::TransportError(format!("bad method: {}", e)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted transport: responses are consumed in queue order and
    /// every request is recorded for later assertions.
    #[derive(Default)]
    pub struct FakeTransport {
        queue: Mutex<VecDeque<HttpResponse>>,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, response: HttpResponse) {
            self.queue.lock().unwrap().push_back(response);
        }

        pub fn push_ok(&self, body: &str) {
            self.push(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: body.to_string(),
            });
        }

        pub fn push_with_cookies(&self, status: u16, body: &str, cookies: &[&str]) {
            self.push(HttpResponse {
                status,
                headers: cookies
                    .iter()
                    .map(|c| ("set-cookie".to_string(), c.to_string()))
                    .collect(),
                body: body.to_string(),
            });
        }

        pub fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SyncError> {
            self.calls.lock().unwrap().push(request);
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| SyncError::TransportError("no scripted response left".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_cookie_lines_keep_order() {
        let response = HttpResponse {
            status: 200,
            headers: vec![
                ("Set-Cookie".into(), "a=1; Path=/".into()),
                ("content-type".into(), "text/html".into()),
                ("set-cookie".into(), "b=2".into()),
            ],
            body: String::new(),
        };
        assert_eq!(response.set_cookie_lines(), vec!["a=1; Path=/", "b=2"]);
        assert_eq!(response.header("Content-Type"), Some("text/html"));
    }

    #[test]
    fn redirect_statuses_are_not_success() {
        let response = HttpResponse {
            status: 302,
            headers: vec![("location".into(), "/login".into())],
            body: String::new(),
        };
        assert!(response.is_redirect());
        assert!(!response.is_success());
    }
}
