//! Service Registry
//!
//! Maps service identifiers to their probe/restart configuration.
//! - Built-in seed data for common systemd services
//! - Runtime registration of custom services
//!
//! Definitions are immutable once registered and handed out as `Arc`s, so a
//! monitor task keeps using the exact configuration it was started with.

pub mod defaults;
pub mod service;

pub use defaults::builtin_services;
pub use service::{parse_port, ServiceConfig, ServiceConfigBuilder};

use crate::error::{Result, SvcwatchError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Insertion-ordered table of service definitions
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: RwLock<Vec<Arc<ServiceConfig>>>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the built-in services
    pub fn with_defaults() -> Result<Self> {
        let services = builtin_services()?.into_iter().map(Arc::new).collect();
        Ok(Self {
            services: RwLock::new(services),
        })
    }

    /// Register a new service; an existing id is never overwritten
    pub async fn register(&self, config: ServiceConfig) -> Result<Arc<ServiceConfig>> {
        let mut services = self.services.write().await;
        if services.iter().any(|s| s.id() == config.id()) {
            return Err(SvcwatchError::DuplicateId(config.id().to_string()));
        }

        let config = Arc::new(config);
        services.push(config.clone());
        debug!("Registered service {} (unit {})", config.id(), config.unit());
        Ok(config)
    }

    /// Look up a service by id
    pub async fn get(&self, id: &str) -> Result<Arc<ServiceConfig>> {
        let services = self.services.read().await;
        services
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| SvcwatchError::UnknownService(id.to_string()))
    }

    /// All services in registration order
    pub async fn list(&self) -> Vec<Arc<ServiceConfig>> {
        self.services.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_seeded_in_order() {
        let registry = ServiceRegistry::with_defaults().unwrap();
        let ids: Vec<String> = registry
            .list()
            .await
            .iter()
            .map(|s| s.id().to_string())
            .collect();

        assert_eq!(
            ids,
            vec!["ssh", "nginx", "apache", "mysql", "postgresql", "mongodb", "redis", "docker"]
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_keeps_original() {
        let registry = ServiceRegistry::with_defaults().unwrap();
        let replacement = ServiceConfig::builder("nginx")
            .unit("openresty")
            .port(Some(8080))
            .build()
            .unwrap();

        let err = registry.register(replacement).await.unwrap_err();
        assert!(matches!(err, SvcwatchError::DuplicateId(ref id) if id == "nginx"));

        let nginx = registry.get("nginx").await.unwrap();
        assert_eq!(nginx.unit(), "nginx");
        assert_eq!(nginx.port(), Some(80));
        assert_eq!(registry.list().await.len(), 8);
    }

    #[tokio::test]
    async fn test_register_and_lookup_custom_service() {
        let registry = ServiceRegistry::new();
        assert!(registry.list().await.is_empty());

        let config = ServiceConfig::builder("queue").port(Some(5672)).build().unwrap();
        registry.register(config).await.unwrap();

        assert_eq!(registry.get("queue").await.unwrap().port(), Some(5672));
        assert!(matches!(
            registry.get("missing").await,
            Err(SvcwatchError::UnknownService(_))
        ));
    }
}
