use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(CampaignId);

/// Advertiser campaign pulled from a network during sync.
/// Upsert key: (connection_id, external_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub base: BaseAggregate<CampaignId>,

    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub network_id: Uuid,

    /// Campaign id as the network reports it
    pub external_id: String,
    pub name: String,
    pub status: Option<String>,
    pub tracking_url: Option<String>,
}

impl Campaign {
    pub fn new_for_insert(
        connection_id: Uuid,
        user_id: Uuid,
        network_id: Uuid,
        external_id: String,
        name: String,
    ) -> Self {
        let code = format!("CMP-{}", external_id);
        Self {
            base: BaseAggregate::new(CampaignId::new_v4(), code, name.clone()),
            connection_id,
            user_id,
            network_id,
            external_id,
            name,
            status: None,
            tracking_url: None,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Campaign {
    type Id = CampaignId;

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
        "a003"
    }

    fn collection_name() -> &'static str {
        "campaign"
    }
}
