pub mod marketeers;
pub mod omolaat;

use crate::shared::config::Config;
use crate::sync::service::NetworkRegistry;
use crate::sync::transport::ReqwestTransport;
use contracts::sync::SyncError;
use std::sync::Arc;

/// Build the registry of protocol clients from the engine config. Each
/// network gets its own transport so per-network timeouts apply.
pub fn build_registry(config: &Config) -> Result<NetworkRegistry, SyncError> {
    let mut registry = NetworkRegistry::new();

    for (slug, network) in &config.networks {
        let transport = Arc::new(ReqwestTransport::new(network.timeout_seconds)?);
        match slug.as_str() {
            "omolaat" => {
                let codec = Arc::new(omolaat::codec::AesGcmCodec::from_passphrase(
                    network.envelope_key.as_deref().unwrap_or_default(),
                ));
                let client =
                    omolaat::client::OmolaatClient::new(transport, codec, network.base_url.clone());
                registry.register(omolaat::service::OmolaatService::new(client));
            }
            "marketeers" => {
                let client = marketeers::client::MarketeersClient::new(
                    transport,
                    network.base_url.clone(),
                );
                registry.register(marketeers::service::MarketeersService::new(client));
            }
            other => {
                tracing::warn!("No protocol client for configured network '{}'", other);
            }
        }
    }

    Ok(registry)
}
