use chrono::Utc;
use contracts::domain::a002_network_connection::aggregate::{
    NetworkConnection, NetworkConnectionId,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_network_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: String,
    pub network_id: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub last_test_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_test_success: Option<bool>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NetworkConnection {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        NetworkConnection {
            base: BaseAggregate::with_metadata(
                NetworkConnectionId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            network_id: Uuid::parse_str(&m.network_id).unwrap_or_default(),
            email: m.email,
            password: m.password,
            is_active: m.is_active,
            last_test_at: m.last_test_at,
            last_test_success: m.last_test_success,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn list_by_user(user_id: Uuid) -> anyhow::Result<Vec<NetworkConnection>> {
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

/// Active connections count toward the plan's network cap
pub async fn count_active_by_user(user_id: Uuid) -> anyhow::Result<i64> {
    let count = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::UserId.eq(user_id.to_string()))
        .filter(Column::IsActive.eq(true))
        .count(conn())
        .await?;
    Ok(count as i64)
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<NetworkConnection>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn get_by_user_and_network(
    user_id: Uuid,
    network_id: Uuid,
) -> anyhow::Result<Option<NetworkConnection>> {
    let result = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::UserId.eq(user_id.to_string()))
        .filter(Column::NetworkId.eq(network_id.to_string()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &NetworkConnection) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        email: Set(aggregate.email.clone()),
        password: Set(aggregate.password.clone()),
        is_active: Set(aggregate.is_active),
        last_test_at: Set(aggregate.last_test_at),
        last_test_success: Set(aggregate.last_test_success),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &NetworkConnection) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        network_id: Set(aggregate.network_id.to_string()),
        email: Set(aggregate.email.clone()),
        password: Set(aggregate.password.clone()),
        is_active: Set(aggregate.is_active),
        last_test_at: Set(aggregate.last_test_at),
        last_test_success: Set(aggregate.last_test_success),
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
