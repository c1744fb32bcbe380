use super::repository;
use contracts::domain::a001_network::aggregate::{Network, NetworkCapabilities, NetworkDto};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Create a network catalog entry
pub async fn create(dto: NetworkDto) -> anyhow::Result<Uuid> {
    let code = dto
        .code
        .clone()
        .unwrap_or_else(|| format!("NET-{}", Uuid::new_v4()));
    let capabilities = NetworkCapabilities::from_map(dto.capabilities)
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;
    let mut aggregate = Network::new_for_insert(
        code,
        dto.description,
        dto.slug,
        dto.base_url,
        capabilities,
    );
    aggregate.base.comment = dto.comment;
    aggregate.is_enabled = dto.is_enabled;

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    aggregate.before_write();

    repository::insert(&aggregate).await
}

/// Update an existing catalog entry
pub async fn update(dto: NetworkDto) -> anyhow::Result<()> {
    let id = dto
        .id
        .as_ref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| anyhow::anyhow!("Invalid ID"))?;

    let mut aggregate = repository::get_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Not found"))?;

    aggregate.base.description = dto.description;
    aggregate.base.comment = dto.comment;
    aggregate.slug = dto.slug;
    aggregate.base_url = dto.base_url;
    aggregate.capabilities = NetworkCapabilities::from_map(dto.capabilities)
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;
    aggregate.is_enabled = dto.is_enabled;

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    aggregate.before_write();

    repository::update(&aggregate).await
}

pub async fn delete(id: Uuid) -> anyhow::Result<bool> {
    repository::soft_delete(id).await
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<Network>> {
    repository::get_by_id(id).await
}

pub async fn get_by_slug(slug: &str) -> anyhow::Result<Option<Network>> {
    repository::get_by_slug(slug).await
}

pub async fn list_all() -> anyhow::Result<Vec<Network>> {
    repository::list_all().await
}

/// Seed the network catalog on first start. Entries without a protocol
/// client stay disabled until one exists.
pub async fn seed_catalog() -> anyhow::Result<()> {
    if !repository::list_all().await?.is_empty() {
        return Ok(());
    }

    let data = vec![
        NetworkDto {
            id: None,
            code: Some("net-omolaat".into()),
            description: "Omolaat".into(),
            comment: None,
            slug: "omolaat".into(),
            base_url: None,
            capabilities: caps(&[
                ("requires_envelope", serde_json::json!(true)),
                ("supports_coupons", serde_json::json!(true)),
                ("supports_orders", serde_json::json!(true)),
                ("supports_campaigns", serde_json::json!(true)),
                ("page_size_max", serde_json::json!(500)),
            ]),
            is_enabled: true,
        },
        NetworkDto {
            id: None,
            code: Some("net-marketeers".into()),
            description: "Marketeers".into(),
            comment: None,
            slug: "marketeers".into(),
            base_url: None,
            capabilities: caps(&[
                ("supports_coupons", serde_json::json!(true)),
                ("supports_orders", serde_json::json!(true)),
                ("page_size_max", serde_json::json!(200)),
            ]),
            is_enabled: true,
        },
        NetworkDto {
            id: None,
            code: Some("net-globalemedia".into()),
            description: "Globalemedia".into(),
            comment: Some("No protocol client yet".into()),
            slug: "globalemedia".into(),
            base_url: None,
            capabilities: caps(&[("supports_coupons", serde_json::json!(true))]),
            is_enabled: false,
        },
        NetworkDto {
            id: None,
            code: Some("net-platformance".into()),
            description: "Platformance".into(),
            comment: Some("No protocol client yet".into()),
            slug: "platformance".into(),
            base_url: None,
            capabilities: caps(&[
                ("supports_coupons", serde_json::json!(true)),
                ("supports_orders", serde_json::json!(true)),
            ]),
            is_enabled: false,
        },
    ];

    for dto in data {
        create(dto).await?;
    }

    Ok(())
}

fn caps(entries: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
