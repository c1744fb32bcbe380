use chrono::Utc;
use contracts::domain::a006_plan::aggregate::{Limit, Plan, PlanId, SyncWindowUnit};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a006_plan")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    /// Raw limit convention: -1 unlimited, 0 forbidden, N hard cap
    pub max_networks: i64,
    pub daily_sync_limit: i64,
    pub monthly_sync_limit: i64,
    pub revenue_cap: i64,
    pub orders_cap: i64,
    pub sync_window_unit: Option<String>,
    pub sync_window_size: Option<i64>,
    pub sync_allowed_from: Option<String>,
    pub sync_allowed_to: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn parse_time(s: &Option<String>) -> Option<chrono::NaiveTime> {
    s.as_deref()
        .and_then(|v| chrono::NaiveTime::parse_from_str(v, "%H:%M:%S").ok())
}

impl From<Model> for Plan {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        Plan {
            base: BaseAggregate::with_metadata(
                PlanId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            max_networks: Limit::from_raw(m.max_networks),
            daily_sync_limit: Limit::from_raw(m.daily_sync_limit),
            monthly_sync_limit: Limit::from_raw(m.monthly_sync_limit),
            revenue_cap: Limit::from_raw(m.revenue_cap),
            orders_cap: Limit::from_raw(m.orders_cap),
            sync_window_unit: m
                .sync_window_unit
                .as_deref()
                .and_then(SyncWindowUnit::from_str_opt),
            sync_window_size: m.sync_window_size,
            sync_allowed_from: parse_time(&m.sync_allowed_from),
            sync_allowed_to: parse_time(&m.sync_allowed_to),
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn list_all() -> anyhow::Result<Vec<Plan>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<Plan>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &Plan) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        max_networks: Set(aggregate.max_networks.as_raw()),
        daily_sync_limit: Set(aggregate.daily_sync_limit.as_raw()),
        monthly_sync_limit: Set(aggregate.monthly_sync_limit.as_raw()),
        revenue_cap: Set(aggregate.revenue_cap.as_raw()),
        orders_cap: Set(aggregate.orders_cap.as_raw()),
        sync_window_unit: Set(aggregate.sync_window_unit.map(|u| u.as_str().to_string())),
        sync_window_size: Set(aggregate.sync_window_size),
        sync_allowed_from: Set(aggregate
            .sync_allowed_from
            .map(|t| t.format("%H:%M:%S").to_string())),
        sync_allowed_to: Set(aggregate
            .sync_allowed_to
            .map(|t| t.format("%H:%M:%S").to_string())),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &Plan) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        max_networks: Set(aggregate.max_networks.as_raw()),
        daily_sync_limit: Set(aggregate.daily_sync_limit.as_raw()),
        monthly_sync_limit: Set(aggregate.monthly_sync_limit.as_raw()),
        revenue_cap: Set(aggregate.revenue_cap.as_raw()),
        orders_cap: Set(aggregate.orders_cap.as_raw()),
        sync_window_unit: Set(aggregate.sync_window_unit.map(|u| u.as_str().to_string())),
        sync_window_size: Set(aggregate.sync_window_size),
        sync_allowed_from: Set(aggregate
            .sync_allowed_from
            .map(|t| t.format("%H:%M:%S").to_string())),
        sync_allowed_to: Set(aggregate
            .sync_allowed_to
            .map(|t| t.format("%H:%M:%S").to_string())),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
