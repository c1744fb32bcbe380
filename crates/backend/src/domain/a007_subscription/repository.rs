use chrono::Utc;
use contracts::domain::a007_subscription::aggregate::{
    Subscription, SubscriptionId, SubscriptionStatus,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a007_subscription")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: String,
    pub plan_id: String,
    /// Flat state columns: "trial" | "active" | "cancelled" | "expired"
    pub status: String,
    pub trial_ends_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ends_at: Option<chrono::DateTime<chrono::Utc>>,
    pub cancelled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Subscription {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let status = SubscriptionStatus::from_columns(
            &m.status,
            m.trial_ends_at,
            m.ends_at,
            m.cancelled_at,
        );

        Subscription {
            base: BaseAggregate::with_metadata(
                SubscriptionId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            plan_id: Uuid::parse_str(&m.plan_id).unwrap_or_default(),
            status,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn status_columns(
    status: &SubscriptionStatus,
) -> (
    String,
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
) {
    match status {
        SubscriptionStatus::Trialing { ends_at } => {
            (status.as_str().to_string(), Some(*ends_at), None, None)
        }
        SubscriptionStatus::Active { ends_at } => {
            (status.as_str().to_string(), None, *ends_at, None)
        }
        SubscriptionStatus::Cancelled { at } => {
            (status.as_str().to_string(), None, None, Some(*at))
        }
        SubscriptionStatus::Expired => (status.as_str().to_string(), None, None, None),
    }
}

/// Latest subscription row for a user, valid or not. The caller judges
/// validity; a missing row means the user never subscribed.
pub async fn get_latest_by_user(user_id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let result = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::UserId.eq(user_id.to_string()))
        .order_by_desc(Column::CreatedAt)
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &Subscription) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let (status, trial_ends_at, ends_at, cancelled_at) = status_columns(&aggregate.status);
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        plan_id: Set(aggregate.plan_id.to_string()),
        status: Set(status),
        trial_ends_at: Set(trial_ends_at),
        ends_at: Set(ends_at),
        cancelled_at: Set(cancelled_at),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &Subscription) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let (status, trial_ends_at, ends_at, cancelled_at) = status_columns(&aggregate.status);
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        plan_id: Set(aggregate.plan_id.to_string()),
        status: Set(status),
        trial_ends_at: Set(trial_ends_at),
        ends_at: Set(ends_at),
        cancelled_at: Set(cancelled_at),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
