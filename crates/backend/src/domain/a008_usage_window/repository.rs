use chrono::{DateTime, Utc};
use contracts::domain::a008_usage_window::aggregate::{UsagePeriod, UsageWindow, UsageWindowId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a008_usage_window")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: String,
    pub period: String,
    pub window_start: chrono::DateTime<chrono::Utc>,
    pub window_end: chrono::DateTime<chrono::Utc>,
    pub sync_count: i64,
    pub revenue_sum: f64,
    pub orders_count: i64,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UsageWindow {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        UsageWindow {
            base: BaseAggregate::with_metadata(
                UsageWindowId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            user_id: Uuid::parse_str(&m.user_id).unwrap_or_default(),
            period: UsagePeriod::from_str_opt(&m.period).unwrap_or(UsagePeriod::Daily),
            window_start: m.window_start,
            window_end: m.window_end,
            sync_count: m.sync_count,
            revenue_sum: m.revenue_sum,
            orders_count: m.orders_count,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn get_by_user_and_period(
    user_id: Uuid,
    period: UsagePeriod,
) -> anyhow::Result<Option<UsageWindow>> {
    let result = Entity::find()
        .filter(Column::UserId.eq(user_id.to_string()))
        .filter(Column::Period.eq(period.as_str()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// The open window for (user, period), creating one when none exists.
/// A stale window is handed back as-is; only rotation moves its bounds.
pub async fn get_or_open(
    user_id: Uuid,
    period: UsagePeriod,
    now: DateTime<Utc>,
) -> anyhow::Result<UsageWindow> {
    if let Some(window) = get_by_user_and_period(user_id, period).await? {
        return Ok(window);
    }
    let window = UsageWindow::new_open(user_id, period, now);
    insert(&window).await?;
    Ok(window)
}

/// Add one sync run's usage to both the daily and the monthly window in
/// a single transaction. Increments happen SQL-side so concurrent jobs
/// never lose counts to read-modify-write races.
///
/// Window bounds are only ever moved by the rotation job. Usage booked
/// after a window expired but before its next rotation lands on the
/// stale row and is zeroed with it; the sync gate already treats stale
/// rows as empty, so the gap under-counts in the user's favor, bounded
/// by the rotation interval.
pub async fn add_counts(
    user_id: Uuid,
    sync_delta: i64,
    revenue_delta: f64,
    orders_delta: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    // Make sure both rows exist before the atomic update
    get_or_open(user_id, UsagePeriod::Daily, now).await?;
    get_or_open(user_id, UsagePeriod::Monthly, now).await?;

    let txn = conn().begin().await?;
    for period in [UsagePeriod::Daily, UsagePeriod::Monthly] {
        Entity::update_many()
            .col_expr(
                Column::SyncCount,
                Expr::col(Column::SyncCount).add(sync_delta),
            )
            .col_expr(
                Column::RevenueSum,
                Expr::col(Column::RevenueSum).add(revenue_delta),
            )
            .col_expr(
                Column::OrdersCount,
                Expr::col(Column::OrdersCount).add(orders_delta),
            )
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::UserId.eq(user_id.to_string()))
            .filter(Column::Period.eq(period.as_str()))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(())
}

/// Reset every window whose end has passed, advancing its bounds to the
/// period containing `now`. Returns the number of rotated windows.
pub async fn rotate_expired(now: DateTime<Utc>) -> anyhow::Result<u64> {
    let stale = Entity::find()
        .filter(Column::WindowEnd.lte(now))
        .all(conn())
        .await?;

    let mut rotated = 0u64;
    for model in stale {
        let period = UsagePeriod::from_str_opt(&model.period).unwrap_or(UsagePeriod::Daily);
        let (start, end) = period.bounds_for(now);
        Entity::update_many()
            .col_expr(Column::WindowStart, Expr::value(start))
            .col_expr(Column::WindowEnd, Expr::value(end))
            .col_expr(Column::SyncCount, Expr::value(0i64))
            .col_expr(Column::RevenueSum, Expr::value(0.0f64))
            .col_expr(Column::OrdersCount, Expr::value(0i64))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(model.id.clone()))
            .exec(conn())
            .await?;
        rotated += 1;
    }
    Ok(rotated)
}

pub async fn insert(aggregate: &UsageWindow) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        user_id: Set(aggregate.user_id.to_string()),
        period: Set(aggregate.period.as_str().to_string()),
        window_start: Set(aggregate.window_start),
        window_end: Set(aggregate.window_end),
        sync_count: Set(aggregate.sync_count),
        revenue_sum: Set(aggregate.revenue_sum),
        orders_count: Set(aggregate.orders_count),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}
