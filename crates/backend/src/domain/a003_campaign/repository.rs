use chrono::Utc;
use contracts::domain::a003_campaign::aggregate::{Campaign, CampaignId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_campaign")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub connection_id: String,
    pub user_id: String,
    pub network_id: String,
    pub external_id: String,
    pub name: String,
    pub status: Option<String>,
    pub tracking_url: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Campaign {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        Campaign {
            base: BaseAggregate::with_metadata(
                CampaignId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            connection_id: Uuid::parse_str(&m.connection_id).unwrap_or_default(),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            network_id: Uuid::parse_str(&m.network_id).unwrap_or_default(),
            external_id: m.external_id,
            name: m.name,
            status: m.status,
            tracking_url: m.tracking_url,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn list_by_connection(connection_id: Uuid) -> anyhow::Result<Vec<Campaign>> {
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
    external_id: &str,
) -> anyhow::Result<Option<Campaign>> {
    let result = Entity::find()
        .filter(Column::ConnectionId.eq(connection_id.to_string()))
        .filter(Column::ExternalId.eq(external_id))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Insert or refresh by the natural key (connection_id, external_id)
pub async fn upsert(aggregate: &mut Campaign) -> anyhow::Result<Uuid> {
    match get_by_key(aggregate.connection_id, &aggregate.external_id).await? {
        Some(existing) => {
            let mut merged = existing;
            merged.name = aggregate.name.clone();
            merged.base.description = aggregate.name.clone();
            merged.status = aggregate.status.clone();
            merged.tracking_url = aggregate.tracking_url.clone();
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

pub async fn insert(aggregate: &Campaign) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        connection_id: Set(aggregate.connection_id.to_string()),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        external_id: Set(aggregate.external_id.clone()),
        name: Set(aggregate.name.clone()),
        status: Set(aggregate.status.clone()),
        tracking_url: Set(aggregate.tracking_url.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &Campaign) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        connection_id: Set(aggregate.connection_id.to_string()),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        external_id: Set(aggregate.external_id.clone()),
        name: Set(aggregate.name.clone()),
        status: Set(aggregate.status.clone()),
        tracking_url: Set(aggregate.tracking_url.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
