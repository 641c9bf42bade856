//! Health tracking for the priority service
//!
//! Components are either critical (the service cannot answer without them)
//! or optional. An unhealthy optional component only degrades overall health.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub critical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, critical: bool, message: Option<String>) -> Self {
        Self {
            status,
            critical,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst critical status wins; optional failures cap out at degraded
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match (health.status, health.critical) {
                (ComponentStatus::Unhealthy, true) => return ComponentStatus::Unhealthy,
                (ComponentStatus::Unhealthy, false) | (ComponentStatus::Degraded, _) => {
                    has_degraded = true
                }
                (ComponentStatus::Healthy, _) => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const PRIMARY_MODEL: &str = "primary_model";
    pub const SECONDARY_MODEL: &str = "secondary_model";
}

#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component the service cannot run without
    pub async fn register_critical(&self, name: &str) {
        self.insert(name, ComponentHealth::with_status(ComponentStatus::Healthy, true, None))
            .await;
    }

    /// Register a component whose failure only degrades the service
    pub async fn register_optional(&self, name: &str) {
        self.insert(name, ComponentHealth::with_status(ComponentStatus::Healthy, false, None))
            .await;
    }

    async fn insert(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    async fn set_status(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        let mut components = self.components.write().await;
        // unknown components are tracked as optional
        let critical = components.get(name).map(|c| c.critical).unwrap_or(false);
        components.insert(
            name.to_string(),
            ComponentHealth::with_status(status, critical, message),
        );
    }

    pub async fn set_healthy(&self, name: &str, message: Option<String>) {
        self.set_status(name, ComponentStatus::Healthy, message).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.set_status(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Models not yet loaded".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_optional_failure_only_degrades() {
        let registry = HealthRegistry::new();
        registry.register_critical(components::PRIMARY_MODEL).await;
        registry.register_optional(components::SECONDARY_MODEL).await;

        registry
            .set_unhealthy(components::SECONDARY_MODEL, "graph failed to load")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(!health.components[components::SECONDARY_MODEL].critical);
    }

    #[tokio::test]
    async fn test_critical_failure_is_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register_critical(components::PRIMARY_MODEL).await;
        registry
            .set_unhealthy(components::PRIMARY_MODEL, "artifact missing")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(health.components[components::PRIMARY_MODEL].critical);
    }

    #[tokio::test]
    async fn test_healthy_with_message() {
        let registry = HealthRegistry::new();
        registry.register_optional(components::SECONDARY_MODEL).await;
        registry
            .set_healthy(components::SECONDARY_MODEL, Some("not configured".to_string()))
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(
            health.components[components::SECONDARY_MODEL].message.as_deref(),
            Some("not configured")
        );
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_critical_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register_critical(components::PRIMARY_MODEL).await;
        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::PRIMARY_MODEL, "Failed").await;
        assert!(!registry.readiness().await.ready);
    }
}
