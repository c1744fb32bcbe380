use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(PurchaseId);

/// Attributed order row pulled from a network.
/// Affiliate commission and gross order amount are separate figures and
/// stay separate through every aggregation.
/// Upsert key: (connection_id, external_order_id, coupon_code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub base: BaseAggregate<PurchaseId>,

    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub network_id: Uuid,

    pub campaign_external_id: String,
    pub coupon_code: String,
    pub external_order_id: String,
    pub order_date: chrono::NaiveDate,

    /// Commission owed to the affiliate
    pub affiliate_amount: f64,
    /// Gross order value at the merchant
    pub order_amount: f64,
    pub currency: String,
    pub quantity: i32,
}

impl Purchase {
    #[allow(clippy::too_many_arguments)]
    pub fn new_for_insert(
        connection_id: Uuid,
        user_id: Uuid,
        network_id: Uuid,
        campaign_external_id: String,
        coupon_code: String,
        external_order_id: String,
        order_date: chrono::NaiveDate,
        affiliate_amount: f64,
        order_amount: f64,
        currency: String,
        quantity: i32,
    ) -> Self {
        let code = format!("ORD-{}", external_order_id);
        let description = format!("{} / {}", coupon_code, external_order_id);
        Self {
            base: BaseAggregate::new(PurchaseId::new_v4(), code, description),
            connection_id,
            user_id,
            network_id,
            campaign_external_id,
            coupon_code,
            external_order_id,
            order_date,
            affiliate_amount,
            order_amount,
            currency,
            quantity,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Purchase {
    type Id = PurchaseId;

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
        "a005"
    }

    fn collection_name() -> &'static str {
        "purchase"
    }
}
