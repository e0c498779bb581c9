//! Health verdicts from a status command plus an optional port check

use super::command::CommandRunner;
use super::port::PortChecker;
use crate::registry::ServiceConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a single health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeVerdict {
    pub healthy: bool,
    /// Status command stdout when healthy, otherwise the failure reason
    pub detail: String,
}

impl ProbeVerdict {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: true,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// Checks whether a service is alive
///
/// Healthy iff the status command exits 0 and, when a port is configured,
/// the port accepts a connection.
#[derive(Clone)]
pub struct HealthProbe {
    runner: Arc<dyn CommandRunner>,
    ports: Arc<dyn PortChecker>,
}

impl HealthProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, ports: Arc<dyn PortChecker>) -> Self {
        Self { runner, ports }
    }

    pub async fn check(&self, config: &ServiceConfig) -> ProbeVerdict {
        let output = self.runner.run(config.status_command()).await;

        let port_open = match config.port() {
            Some(port) => Some(self.ports.is_open(port).await),
            None => None,
        };

        debug!(
            service = config.id(),
            exit_code = output.exit_code,
            port_open = ?port_open,
            "Health check completed"
        );

        if !output.success() {
            return ProbeVerdict::unhealthy(output.stderr);
        }

        match (config.port(), port_open) {
            (Some(port), Some(false)) => ProbeVerdict::unhealthy(format!(
                "service is running but port {port} is not open"
            )),
            _ => ProbeVerdict::healthy(output.stdout),
        }
    }
}

impl std::fmt::Debug for HealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthProbe").finish_non_exhaustive()
    }
}
