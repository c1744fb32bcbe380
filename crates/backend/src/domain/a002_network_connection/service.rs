use super::repository;
use crate::sync::limits::PlanLimitService;
use contracts::domain::a002_network_connection::aggregate::{
    NetworkConnection, NetworkConnectionDto,
};
use uuid::Uuid;

/// Create a connection. Activating one is a billable action, so the
/// plan's network cap is checked before anything is written.
pub async fn create(dto: NetworkConnectionDto, limits: &PlanLimitService) -> anyhow::Result<Uuid> {
    if dto.is_active {
        limits
            .assert_can_add_network(dto.user_id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }

    let code = dto
        .code
        .clone()
        .unwrap_or_else(|| format!("CONN-{}", Uuid::new_v4()));
    let mut aggregate = NetworkConnection::new_for_insert(
        code,
        dto.description,
        dto.user_id,
        dto.network_id,
        dto.email,
        dto.password,
    );
    aggregate.base.comment = dto.comment;
    aggregate.is_active = dto.is_active;

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    aggregate.before_write();

    repository::insert(&aggregate).await
}

/// Update a connection. Flipping it to active re-checks the network cap.
pub async fn update(dto: NetworkConnectionDto, limits: &PlanLimitService) -> anyhow::Result<()> {
    let id = dto
        .id
        .as_ref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| anyhow::anyhow!("Invalid ID"))?;

    let mut aggregate = repository::get_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Not found"))?;

    if dto.is_active && !aggregate.is_active {
        limits
            .assert_can_add_network(aggregate.user_id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }

    aggregate.base.description = dto.description;
    aggregate.base.comment = dto.comment;
    aggregate.email = dto.email;
    aggregate.password = dto.password;
    aggregate.is_active = dto.is_active;

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    aggregate.before_write();

    repository::update(&aggregate).await
}

pub async fn delete(id: Uuid) -> anyhow::Result<bool> {
    repository::soft_delete(id).await
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<NetworkConnection>> {
    repository::get_by_id(id).await
}

pub async fn list_by_user(user_id: Uuid) -> anyhow::Result<Vec<NetworkConnection>> {
    repository::list_by_user(user_id).await
}

/// Persist the outcome of a connection test
pub async fn record_test_outcome(id: Uuid, success: bool) -> anyhow::Result<()> {
    let mut aggregate = repository::get_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Not found"))?;
    aggregate.record_test_outcome(success);
    aggregate.before_write();
    repository::update(&aggregate).await
}
