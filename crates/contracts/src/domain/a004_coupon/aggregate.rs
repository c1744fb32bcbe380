use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(CouponId);

/// Coupon code assigned to a user on a network.
/// Upsert key: (connection_id, campaign_external_id, coupon_code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub base: BaseAggregate<CouponId>,

    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub network_id: Uuid,

    pub campaign_external_id: String,
    pub coupon_code: String,
    pub status: Option<String>,
}

impl Coupon {
    pub fn new_for_insert(
        connection_id: Uuid,
        user_id: Uuid,
        network_id: Uuid,
        campaign_external_id: String,
        coupon_code: String,
    ) -> Self {
        let code = format!("CPN-{}", coupon_code);
        let description = format!("{} / {}", campaign_external_id, coupon_code);
        Self {
            base: BaseAggregate::new(CouponId::new_v4(), code, description),
            connection_id,
            user_id,
            network_id,
            campaign_external_id,
            coupon_code,
            status: None,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Coupon {
    type Id = CouponId;

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
        "a004"
    }

    fn collection_name() -> &'static str {
        "coupon"
    }
}
