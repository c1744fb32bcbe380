use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(NetworkConnectionId);

/// A user's credential-bearing connection to one affiliate network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConnection {
    pub base: BaseAggregate<NetworkConnectionId>,

    pub user_id: Uuid,
    pub network_id: Uuid,

    pub email: String,
    pub password: String,

    /// Counted against the plan's max_networks cap while set
    pub is_active: bool,

    pub last_test_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_test_success: Option<bool>,
}

impl NetworkConnection {
    pub fn new_for_insert(
        code: String,
        description: String,
        user_id: Uuid,
        network_id: Uuid,
        email: String,
        password: String,
    ) -> Self {
        Self {
            base: BaseAggregate::new(NetworkConnectionId::new_v4(), code, description),
            user_id,
            network_id,
            email,
            password,
            is_active: true,
            last_test_at: None,
            last_test_success: None,
        }
    }

    pub fn record_test_outcome(&mut self, success: bool) {
        self.last_test_at = Some(chrono::Utc::now());
        self.last_test_success = Some(success);
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Description must not be empty".into());
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("A valid login email is required".into());
        }
        if self.password.is_empty() {
            return Err("Password must not be empty".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for NetworkConnection {
    type Id = NetworkConnectionId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a002"
    }

    fn collection_name() -> &'static str {
        "network_connection"
    }
}

/// DTO for creating/updating a connection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConnectionDto {
    pub id: Option<String>,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: Uuid,
    pub network_id: Uuid,
    pub email: String,
    pub password: String,
    pub is_active: bool,
}
