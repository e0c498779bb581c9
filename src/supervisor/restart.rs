//! Restart execution
//!
//! One restart command per call. Retry policy lives in the monitor task.

use crate::event_log::EventLog;
use crate::probe::CommandRunner;
use crate::registry::ServiceConfig;
use std::sync::Arc;

/// Runs a service's restart command and logs the outcome
#[derive(Clone)]
pub struct RestartExecutor {
    runner: Arc<dyn CommandRunner>,
    log: Arc<EventLog>,
}

impl RestartExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, log: Arc<EventLog>) -> Self {
        Self { runner, log }
    }

    /// Returns true when the restart command exits with code 0
    pub async fn restart(&self, config: &ServiceConfig) -> bool {
        self.log
            .warning(format!("Attempting to restart {}...", config.id()));

        let output = self.runner.run(config.restart_command()).await;
        if output.success() {
            self.log
                .success(format!("Successfully restarted {}", config.id()));
            true
        } else {
            self.log.error(format!(
                "Failed to restart {}: {}",
                config.id(),
                output.stderr.trim()
            ));
            false
        }
    }
}

impl std::fmt::Debug for RestartExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestartExecutor")
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}
