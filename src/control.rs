//! Command surface
//!
//! `Controller` is the context object the entry point builds once and hands
//! to whatever drives the monitor (the CLI, a menu, a scheduler). It owns the
//! service registry, the event log and the monitor registry; nothing in the
//! crate reaches for global state.

use crate::config::AppConfig;
use crate::error::Result;
use crate::event_log::EventLog;
use crate::probe::{
    CommandRunner, HealthProbe, PortChecker, ProbeVerdict, ShellRunner, TcpPortChecker,
};
use crate::registry::{ServiceConfig, ServiceRegistry};
use crate::supervisor::{
    MonitorDeps, MonitorEvent, MonitorPolicy, MonitorRegistry, MonitorState, RestartExecutor,
    Sleeper, TokioSleeper,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Entry point for every operator action
pub struct Controller {
    services: Arc<ServiceRegistry>,
    log: Arc<EventLog>,
    probe: HealthProbe,
    restarter: RestartExecutor,
    monitors: MonitorRegistry,
}

impl Controller {
    pub fn builder(services: Arc<ServiceRegistry>, log: Arc<EventLog>) -> ControllerBuilder {
        ControllerBuilder::new(services, log)
    }

    /// Build a controller backed by real commands and sockets
    pub async fn from_config(config: &AppConfig, log: Arc<EventLog>) -> Result<Self> {
        let services = Arc::new(config.build_registry().await?);
        Ok(Self::builder(services, log)
            .port_checker(Arc::new(config.port_checker()?))
            .policy(config.policy()?)
            .build())
    }

    /// All registered services in registration order
    pub async fn list_services(&self) -> Vec<Arc<ServiceConfig>> {
        self.services.list().await
    }

    /// Register a custom service
    pub async fn register_service(&self, config: ServiceConfig) -> Result<()> {
        let id = config.id().to_string();
        match self.services.register(config).await {
            Ok(_) => {
                self.log.success(format!("Service {} added successfully", id));
                Ok(())
            }
            Err(e) => {
                self.log.warning(format!("Service {} already exists", id));
                Err(e)
            }
        }
    }

    /// Start monitoring `id`; `None` uses the configured default interval
    pub async fn start_monitoring(
        &self,
        id: &str,
        interval: Option<Duration>,
    ) -> Result<MonitorState> {
        self.monitors.start(id, interval).await
    }

    pub async fn stop_monitoring(&self, id: &str) -> Result<()> {
        self.monitors.stop(id).await
    }

    /// Run a one-off health check
    pub async fn get_status(&self, id: &str) -> Result<ProbeVerdict> {
        let config = self.services.get(id).await?;
        Ok(self.probe.check(&config).await)
    }

    /// Restart `id` right now, outside the monitor's schedule
    ///
    /// A successful restart of a monitored service counts towards that
    /// task's restart total.
    pub async fn restart_now(&self, id: &str) -> Result<bool> {
        let config = match self.services.get(id).await {
            Ok(config) => config,
            Err(e) => {
                self.log
                    .error(format!("Cannot restart {}: Service not configured", id));
                return Err(e);
            }
        };

        let restarted = self.restarter.restart(&config).await;
        if restarted {
            self.monitors.record_manual_restart(id, Utc::now()).await;
        }
        Ok(restarted)
    }

    /// Snapshot of every monitored service
    pub async fn dashboard_snapshot(&self) -> Vec<MonitorState> {
        self.monitors.snapshot_all().await
    }

    /// Snapshot of one monitored service
    pub async fn monitor_state(&self, id: &str) -> Result<MonitorState> {
        self.monitors.snapshot(id).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.monitors.subscribe()
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// Stop every monitor task and wait for them to exit
    pub async fn shutdown(&self) {
        self.monitors.shutdown().await;
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("log", &self.log)
            .field("monitors", &self.monitors)
            .finish_non_exhaustive()
    }
}

/// Builder for `Controller`; every seam defaults to the real implementation
pub struct ControllerBuilder {
    services: Arc<ServiceRegistry>,
    log: Arc<EventLog>,
    runner: Arc<dyn CommandRunner>,
    ports: Arc<dyn PortChecker>,
    sleeper: Arc<dyn Sleeper>,
    policy: MonitorPolicy,
}

impl ControllerBuilder {
    pub fn new(services: Arc<ServiceRegistry>, log: Arc<EventLog>) -> Self {
        Self {
            services,
            log,
            runner: Arc::new(ShellRunner::default()),
            ports: Arc::new(TcpPortChecker::default()),
            sleeper: Arc::new(TokioSleeper),
            policy: MonitorPolicy::default(),
        }
    }

    pub fn command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn port_checker(mut self, ports: Arc<dyn PortChecker>) -> Self {
        self.ports = ports;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(mut self, policy: MonitorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Controller {
        let probe = HealthProbe::new(self.runner.clone(), self.ports);
        let restarter = RestartExecutor::new(self.runner, self.log.clone());
        let (event_tx, _) = broadcast::channel(256);

        let deps = MonitorDeps {
            probe: probe.clone(),
            restarter: restarter.clone(),
            sleeper: self.sleeper,
            log: self.log.clone(),
            event_tx,
        };
        let monitors = MonitorRegistry::new(self.services.clone(), deps, self.policy);

        Controller {
            services: self.services,
            log: self.log,
            probe,
            restarter,
            monitors,
        }
    }
}
