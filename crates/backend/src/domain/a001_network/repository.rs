use chrono::Utc;
use contracts::domain::a001_network::aggregate::{Network, NetworkCapabilities, NetworkId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_network")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub slug: String,
    pub base_url: Option<String>,
    /// Capability map stored as a JSON object
    pub capabilities: String,
    pub is_enabled: bool,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Network {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&m.capabilities).unwrap_or_default();
        let capabilities = match NetworkCapabilities::from_map(raw) {
            Ok(caps) => caps,
            Err(e) => {
                tracing::warn!("Network {}: {}", m.id, e);
                NetworkCapabilities::default()
            }
        };

        Network {
            base: BaseAggregate::with_metadata(
                NetworkId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            slug: m.slug,
            base_url: m.base_url,
            capabilities,
            is_enabled: m.is_enabled,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn capabilities_json(aggregate: &Network) -> String {
    serde_json::to_string(aggregate.capabilities.as_map()).unwrap_or_else(|_| "{}".to_string())
}

pub async fn list_all() -> anyhow::Result<Vec<Network>> {
    let mut items: Vec<Network> = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    items.sort_by(|a, b| {
        a.base
            .description
            .to_lowercase()
            .cmp(&b.base.description.to_lowercase())
    });
    Ok(items)
}

pub async fn list_enabled() -> anyhow::Result<Vec<Network>> {
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

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<Network>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn get_by_slug(slug: &str) -> anyhow::Result<Option<Network>> {
    let result = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::Slug.eq(slug))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &Network) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        slug: Set(aggregate.slug.clone()),
        base_url: Set(aggregate.base_url.clone()),
        capabilities: Set(capabilities_json(aggregate)),
        is_enabled: Set(aggregate.is_enabled),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &Network) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        slug: Set(aggregate.slug.clone()),
        base_url: Set(aggregate.base_url.clone()),
        capabilities: Set(capabilities_json(aggregate)),
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
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .exec(conn())
        .await?;
    Ok(result.rows_affected > 0)
}
