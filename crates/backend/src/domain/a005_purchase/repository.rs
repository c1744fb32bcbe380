use chrono::Utc;
use contracts::domain::a005_purchase::aggregate::{Purchase, PurchaseId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a005_purchase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub connection_id: String,
    pub user_id: String,
    pub network_id: String,
    pub campaign_external_id: String,
    pub coupon_code: String,
    pub external_order_id: String,
    pub order_date: String,
    pub affiliate_amount: f64,
    pub order_amount: f64,
    pub currency: String,
    pub quantity: i32,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Purchase {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let order_date = chrono::NaiveDate::parse_from_str(&m.order_date, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive());

        Purchase {
            base: BaseAggregate::with_metadata(
                PurchaseId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            connection_id: Uuid::parse_str(&m.connection_id).unwrap_or_default(),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            network_id: Uuid::parse_str(&m.network_id).unwrap_or_default(),
            campaign_external_id: m.campaign_external_id,
            coupon_code: m.coupon_code,
            external_order_id: m.external_order_id,
            order_date,
            affiliate_amount: m.affiliate_amount,
            order_amount: m.order_amount,
            currency: m.currency,
            quantity: m.quantity,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn list_by_connection(connection_id: Uuid) -> anyhow::Result<Vec<Purchase>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::ConnectionId.eq(connection_id.to_string()))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_key(
    connection_id: Uuid,
    external_order_id: &str,
    coupon_code: &str,
) -> anyhow::Result<Option<Purchase>> {
    let result = Entity::find()
        .filter(Column::ConnectionId.eq(connection_id.to_string()))
        .filter(Column::ExternalOrderId.eq(external_order_id))
        .filter(Column::CouponCode.eq(coupon_code))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Insert or refresh by (connection_id, external_order_id, coupon_code).
/// Amounts are overwritten with the latest values the network reports.
pub async fn upsert(aggregate: &mut Purchase) -> anyhow::Result<Uuid> {
    match get_by_key(
        aggregate.connection_id,
        &aggregate.external_order_id,
        &aggregate.coupon_code,
    )
    .await?
    {
        Some(existing) => {
            let mut merged = existing;
            merged.campaign_external_id = aggregate.campaign_external_id.clone();
            merged.order_date = aggregate.order_date;
            merged.affiliate_amount = aggregate.affiliate_amount;
            merged.order_amount = aggregate.order_amount;
            merged.currency = aggregate.currency.clone();
            merged.quantity = aggregate.quantity;
            merged.before_write();
            update(&merged).await?;
            Ok(merged.base.id.value())
        }
        None => {
            aggregate.before_write();
            insert(aggregate).await
        }
    }
}

pub async fn insert(aggregate: &Purchase) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        connection_id: Set(aggregate.connection_id.to_string()),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        campaign_external_id: Set(aggregate.campaign_external_id.clone()),
        coupon_code: Set(aggregate.coupon_code.clone()),
        external_order_id: Set(aggregate.external_order_id.clone()),
        order_date: Set(aggregate.order_date.format("%Y-%m-%d").to_string()),
        affiliate_amount: Set(aggregate.affiliate_amount),
        order_amount: Set(aggregate.order_amount),
        currency: Set(aggregate.currency.clone()),
        quantity: Set(aggregate.quantity),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &Purchase) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        connection_id: Set(aggregate.connection_id.to_string()),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        campaign_external_id: Set(aggregate.campaign_external_id.clone()),
        coupon_code: Set(aggregate.coupon_code.clone()),
        external_order_id: Set(aggregate.external_order_id.clone()),
        order_date: Set(aggregate.order_date.format("%Y-%m-%d").to_string()),
        affiliate_amount: Set(aggregate.affiliate_amount),
        order_amount: Set(aggregate.order_amount),
        currency: Set(aggregate.currency.clone()),
        quantity: Set(aggregate.quantity),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
