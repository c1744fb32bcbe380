use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

uuid_aggregate_id!(NetworkId);

/// Capability keys a network entry may declare. Anything else is a config
/// mistake and is rejected at load time.
const KNOWN_CAPABILITY_KEYS: &[&str] = &[
    "requires_envelope",
    "supports_coupons",
    "supports_orders",
    "supports_campaigns",
    "page_size_max",
];

/// Validated per-network capability map
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkCapabilities(BTreeMap<String, serde_json::Value>);

impl NetworkCapabilities {
    pub fn from_map(map: BTreeMap<String, serde_json::Value>) -> Result<Self, String> {
        for key in map.keys() {
            if !KNOWN_CAPABILITY_KEYS.contains(&key.as_str()) {
                return Err(format!("Unknown network capability key: {}", key));
            }
        }
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn as_map(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.0
    }
}

/// Catalog entry for a third-party affiliate network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub base: BaseAggregate<NetworkId>,

    /// Stable machine name used to resolve the protocol client ("omolaat")
    pub slug: String,

    /// Base URL override; the engine config supplies the default
    pub base_url: Option<String>,

    pub capabilities: NetworkCapabilities,

    pub is_enabled: bool,
}

impl Network {
    pub fn new_for_insert(
        code: String,
        description: String,
        slug: String,
        base_url: Option<String>,
        capabilities: NetworkCapabilities,
    ) -> Self {
        Self {
            base: BaseAggregate::new(NetworkId::new_v4(), code, description),
            slug,
            base_url,
            capabilities,
            is_enabled: true,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Network name must not be empty".into());
        }
        if self.slug.trim().is_empty() {
            return Err("Network slug must not be empty".into());
        }
        if self
            .slug
            .chars()
            .any(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '_')
        {
            return Err("Network slug must be lowercase ascii".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Network {
    type Id = NetworkId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a001"
    }

    fn collection_name() -> &'static str {
        "network"
    }
}

/// DTO for creating/updating a network catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkDto {
    pub id: Option<String>,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub slug: String,
    pub base_url: Option<String>,
    pub capabilities: BTreeMap<String, serde_json::Value>,
    pub is_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_capability_key_is_rejected() {
        let mut map = BTreeMap::new();
        map.insert("supports_coupons".to_string(), serde_json::json!(true));
        map.insert("typo_key".to_string(), serde_json::json!(1));
        let err = NetworkCapabilities::from_map(map).unwrap_err();
        assert!(err.contains("typo_key"));
    }

    #[test]
    fn known_capability_keys_load() {
        let mut map = BTreeMap::new();
        map.insert("requires_envelope".to_string(), serde_json::json!(true));
        map.insert("page_size_max".to_string(), serde_json::json!(500));
        let caps = NetworkCapabilities::from_map(map).unwrap();
        assert!(caps.flag("requires_envelope"));
        assert!(!caps.flag("supports_orders"));
    }
}
