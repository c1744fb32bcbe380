use chrono::{DateTime, Utc};
use contracts::domain::a009_sync_schedule::aggregate::{
    SyncSchedule, SyncScheduleId, SyncType,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a009_sync_schedule")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: String,
    /// JSON array of network uuids
    pub network_ids: String,
    pub sync_type: String,
    pub frequency: String,
    pub next_run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub runs_today: i32,
    pub daily_run_limit: i32,
    pub is_enabled: bool,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SyncSchedule {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let network_ids: Vec<Uuid> = serde_json::from_str::<Vec<String>>(&m.network_ids)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| Uuid::parse_str(&s).ok())
            .collect();

        SyncSchedule {
            base: BaseAggregate::with_metadata(
                SyncScheduleId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            network_ids,
            sync_type: SyncType::from_str_opt(&m.sync_type).unwrap_or(SyncType::Full),
            frequency: m.frequency,
            next_run_at: m.next_run_at,
            runs_today: m.runs_today,
            daily_run_limit: m.daily_run_limit,
            is_enabled: m.is_enabled,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn network_ids_json(aggregate: &SyncSchedule) -> String {
    let ids: Vec<String> = aggregate.network_ids.iter().map(|u| u.to_string()).collect();
    serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
}

pub async fn list_enabled() -> anyhow::Result<Vec<SyncSchedule>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::IsEnabled.eq(true))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn list_by_user(user_id: Uuid) -> anyhow::Result<Vec<SyncSchedule>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::UserId.eq(user_id.to_string()))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<SyncSchedule>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

/// Record the outcome of a dispatch: bump today's counter and move the
/// trigger forward
pub async fn update_run_status(
    id: Uuid,
    next_run_at: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    Entity::update_many()
        .col_expr(Column::RunsToday, Expr::col(Column::RunsToday).add(1))
        .col_expr(Column::NextRunAt, Expr::value(next_run_at))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .exec(conn())
        .await?;
    Ok(())
}

/// Midnight rollover: every schedule's daily run counter starts from zero
pub async fn reset_runs_today() -> anyhow::Result<u64> {
    let result = Entity::update_many()
        .col_expr(Column::RunsToday, Expr::value(0i32))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::RunsToday.gt(0))
        .exec(conn())
        .await?;
    Ok(result.rows_affected)
}

pub async fn insert(aggregate: &SyncSchedule) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        network_ids: Set(network_ids_json(aggregate)),
        sync_type: Set(aggregate.sync_type.as_str().to_string()),
        frequency: Set(aggregate.frequency.clone()),
        next_run_at: Set(aggregate.next_run_at),
        runs_today: Set(aggregate.runs_today),
        daily_run_limit: Set(aggregate.daily_run_limit),
        is_enabled: Set(aggregate.is_enabled),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &SyncSchedule) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        network_ids: Set(network_ids_json(aggregate)),
        sync_type: Set(aggregate.sync_type.as_str().to_string()),
        frequency: Set(aggregate.frequency.clone()),
        next_run_at: Set(aggregate.next_run_at),
        runs_today: Set(aggregate.runs_today),
        daily_run_limit: Set(aggregate.daily_run_limit),
        is_enabled: Set(aggregate.is_enabled),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}

pub async fn soft_delete(id: Uuid) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .exec(conn())
        .await?;
    Ok(result.rows_affected > 0)
}
