use async_trait::async_trait;
use contracts::sync::{Credentials, SyncConfig, SyncResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Uniform contract every affiliate network integration implements.
///
/// Both operations return a `SyncResult` rather than an error: a broken
/// network is a reportable outcome, not a reason to unwind the caller.
#[async_trait]
pub trait NetworkService: Send + Sync {
    /// Stable machine name this service is registered under
    fn slug(&self) -> &str;

    /// Login with the given credentials and report whether a session was
    /// established. Read-only and safe to repeat; no sync side effects.
    async fn test_connection(&self, credentials: &Credentials) -> SyncResult;

    /// Full fetch: login (or resume the supplied session), paginate,
    /// normalize, aggregate, and optionally persist.
    async fn sync_data(&self, credentials: &Credentials, config: &SyncConfig) -> SyncResult;
}

/// Registry of network services keyed by slug
pub struct NetworkRegistry {
    services: HashMap<String, Arc<dyn NetworkService>>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    pub fn register<S: NetworkService + 'static>(&mut self, service: S) {
        let slug = service.slug().to_string();
        self.services.insert(slug, Arc::new(service));
    }

    pub fn get(&self, slug: &str) -> Option<Arc<dyn NetworkService>> {
        self.services.get(slug).cloned()
    }

    pub fn slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = self.services.keys().map(String::as_str).collect();
        slugs.sort();
        slugs
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
