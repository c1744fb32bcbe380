use chrono::{DateTime, Utc};
use contracts::domain::a009_sync_schedule::aggregate::SyncType;
use contracts::domain::a010_sync_log::aggregate::{SyncLog, SyncLogId, SyncLogStatus};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a010_sync_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub sync_schedule_id: Option<String>,
    pub user_id: String,
    pub network_id: String,
    pub sync_type: String,
    pub status: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error_message: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SyncLog {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        SyncLog {
            base: BaseAggregate::with_metadata(
                SyncLogId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            sync_schedule_id: m
                .sync_schedule_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            network_id: Uuid::parse_str(&m.network_id).unwrap_or_default(),
            sync_type: SyncType::from_str_opt(&m.sync_type).unwrap_or(SyncType::Full),
            status: SyncLogStatus::from_str_opt(&m.status).unwrap_or(SyncLogStatus::Pending),
            started_at: m.started_at,
            finished_at: m.finished_at,
            error_message: m.error_message,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<SyncLog>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn list_recent(user_id: Uuid, limit: u64) -> anyhow::Result<Vec<SyncLog>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::UserId.eq(user_id.to_string()))
        .order_by_desc(Column::CreatedAt)
        .limit(limit)
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

/// Finish time of the user's most recent successful sync, the anchor for
/// rolling "once per N hours/days" plan restrictions
pub async fn last_success_finished_at(user_id: Uuid) -> anyhow::Result<Option<DateTime<Utc>>> {
    let result = Entity::find()
        .filter(Column::UserId.eq(user_id.to_string()))
        .filter(Column::Status.eq(SyncLogStatus::Success.as_str()))
        .order_by_desc(Column::FinishedAt)
        .one(conn())
        .await?;
    Ok(result.and_then(|m| m.finished_at))
}

pub async fn insert(aggregate: &SyncLog) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        sync_schedule_id: Set(aggregate.sync_schedule_id.map(|u| u.to_string())),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        sync_type: Set(aggregate.sync_type.as_str().to_string()),
        status: Set(aggregate.status.as_str().to_string()),
        started_at: Set(aggregate.started_at),
        finished_at: Set(aggregate.finished_at),
        error_message: Set(aggregate.error_message.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &SyncLog) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        sync_schedule_id: Set(aggregate.sync_schedule_id.map(|u| u.to_string())),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        sync_type: Set(aggregate.sync_type.as_str().to_string()),
        status: Set(aggregate.status.as_str().to_string()),
        started_at: Set(aggregate.started_at),
        finished_at: Set(aggregate.finished_at),
        error_message: Set(aggregate.error_message.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
