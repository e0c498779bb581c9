//! Monitor Registry
//!
//! Process-wide table of running monitor tasks keyed by service id.
//! Snapshots are read from each task's `watch` channel and never wait on a
//! task's loop. A task that ends on its own removes its record, guarded by a
//! generation number so a newer task for the same id is left alone.

use super::monitor::{MonitorDeps, MonitorOutcome, MonitorTask, TaskCommand};
use super::policy::MonitorPolicy;
use super::state::{MonitorEvent, MonitorState};
use crate::error::{Result, SvcwatchError};
use crate::registry::ServiceRegistry;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Registry record for one running task
#[derive(Debug)]
struct MonitorEntry {
    generation: u64,
    state_rx: watch::Receiver<MonitorState>,
    command_tx: mpsc::UnboundedSender<TaskCommand>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Table of active monitor tasks
pub struct MonitorRegistry {
    services: Arc<ServiceRegistry>,
    deps: MonitorDeps,
    policy: MonitorPolicy,
    entries: Arc<RwLock<HashMap<String, MonitorEntry>>>,
    start_lock: Mutex<()>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    next_generation: AtomicU64,
}

impl MonitorRegistry {
    /// Create a registry; `policy.interval` is the default poll interval
    pub fn new(services: Arc<ServiceRegistry>, deps: MonitorDeps, policy: MonitorPolicy) -> Self {
        Self {
            services,
            deps,
            policy,
            entries: Arc::new(RwLock::new(HashMap::new())),
            start_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Subscribe to events from every monitor task
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.deps.event_tx.subscribe()
    }

    /// Start monitoring `id`, returning the state recorded from an immediate check
    pub async fn start(&self, id: &str, interval: Option<Duration>) -> Result<MonitorState> {
        let _starting = self.start_lock.lock().await;

        if self.is_shutting_down() {
            return Err(SvcwatchError::Other(anyhow::anyhow!(
                "monitor registry is shutting down"
            )));
        }

        let config = match self.services.get(id).await {
            Ok(config) => config,
            Err(e) => {
                self.deps
                    .log
                    .error(format!("Cannot monitor {}: Service not configured", id));
                return Err(e);
            }
        };

        if self.is_monitored(id).await {
            self.deps
                .log
                .warning(format!("Service {} is already being monitored", id));
            return Err(SvcwatchError::AlreadyMonitored(id.to_string()));
        }

        let interval = interval.unwrap_or(self.policy.interval);
        if interval.is_zero() {
            return Err(SvcwatchError::InvalidServiceConfig(
                "monitoring interval must be positive".to_string(),
            ));
        }
        let policy = self.policy.clone().with_interval(interval);

        let initial = self.deps.probe.check(&config).await;
        let cancel = self.shutdown.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let (task, link) = MonitorTask::new(
            config,
            policy,
            self.deps.clone(),
            &initial,
            cancel.clone(),
        );
        let snapshot = link.state_rx.borrow().clone();

        // Hold the table lock across spawn so a task that ends immediately
        // still finds its own record to remove
        let mut entries = self.entries.write().await;
        let handle = self.tracker.spawn(run_and_deregister(
            task,
            id.to_string(),
            generation,
            self.entries.clone(),
        ));
        entries.insert(
            id.to_string(),
            MonitorEntry {
                generation,
                state_rx: link.state_rx,
                command_tx: link.command_tx,
                cancel,
                handle,
            },
        );
        drop(entries);

        self.deps.log.success(format!(
            "Started monitoring service {} at {} second intervals",
            id,
            interval.as_secs_f64()
        ));
        Ok(snapshot)
    }

    /// Signal the task for `id` to stop and drop its record
    pub async fn stop(&self, id: &str) -> Result<()> {
        let entry = self.entries.write().await.remove(id);
        let Some(entry) = entry else {
            self.deps
                .log
                .warning(format!("Service {} is not currently being monitored", id));
            return Err(SvcwatchError::NotMonitored(id.to_string()));
        };

        entry.cancel.cancel();
        if entry.handle.is_finished() {
            self.deps
                .log
                .warning(format!("Monitoring task for {} was not active", id));
        } else {
            self.deps
                .log
                .info(format!("Stopped monitoring service {}", id));
        }
        Ok(())
    }

    /// Latest published state for `id`
    pub async fn snapshot(&self, id: &str) -> Result<MonitorState> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .map(|e| e.state_rx.borrow().clone())
            .ok_or_else(|| SvcwatchError::NotMonitored(id.to_string()))
    }

    /// Latest published state of every task, ordered by service id
    pub async fn snapshot_all(&self) -> Vec<MonitorState> {
        let entries = self.entries.read().await;
        let mut states: Vec<MonitorState> =
            entries.values().map(|e| e.state_rx.borrow().clone()).collect();
        states.sort_by(|a, b| a.service.cmp(&b.service));
        states
    }

    /// True while a live task exists for `id`
    pub async fn is_monitored(&self, id: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(id).is_some_and(|e| !e.handle.is_finished())
    }

    /// Ids of all monitored services
    pub async fn monitored(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut ids: Vec<String> = entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Tell the task for `id` about a manual restart; false when not monitored
    pub async fn record_manual_restart(&self, id: &str, at: DateTime<Utc>) -> bool {
        let entries = self.entries.read().await;
        match entries.get(id) {
            Some(entry) => entry
                .command_tx
                .send(TaskCommand::RecordManualRestart { at })
                .is_ok(),
            None => false,
        }
    }

    /// Stop every task and wait for all of them to exit
    ///
    /// A `start` already past its shutdown check finishes first, so its
    /// task is stopped and awaited here too.
    pub async fn shutdown(&self) {
        info!("Stopping all monitor tasks");
        let _starting = self.start_lock.lock().await;
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.entries.write().await.clear();
        info!("All monitor tasks stopped");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("policy", &self.policy)
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn run_and_deregister(
    task: MonitorTask,
    id: String,
    generation: u64,
    entries: Arc<RwLock<HashMap<String, MonitorEntry>>>,
) {
    let outcome = task.run().await;

    let mut entries = entries.write().await;
    if entries.get(&id).is_some_and(|e| e.generation == generation) {
        entries.remove(&id);
        debug!("Removed monitor record for {} ({:?})", id, outcome);
    }
    if outcome == MonitorOutcome::Escalated {
        info!("Monitor task for {} escalated and terminated", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::EventLog;
    use crate::probe::command::{CommandOutput, CommandRunner, MockCommandRunner};
    use crate::probe::port::MockPortChecker;
    use crate::probe::HealthProbe;
    use crate::supervisor::policy::Sleeper;
    use crate::supervisor::restart::RestartExecutor;
    use crate::supervisor::state::MonitorPhase;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    /// Never wakes up; tasks only leave their sleep when cancelled
    struct ParkedSleeper;

    #[async_trait]
    impl Sleeper for ParkedSleeper {
        async fn sleep(&self, _duration: Duration) {
            std::future::pending::<()>().await;
        }
    }

    /// Holds the first command until released; later commands succeed at once
    #[derive(Default)]
    struct GatedRunner {
        gated: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl CommandRunner for GatedRunner {
        async fn run(&self, _command: &str) -> CommandOutput {
            if !self.gated.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            CommandOutput::ok("active")
        }
    }

    fn registry_with(runner: MockCommandRunner) -> MonitorRegistry {
        registry_with_runner(Arc::new(runner))
    }

    fn registry_with_runner(runner: Arc<dyn CommandRunner>) -> MonitorRegistry {
        let mut ports = MockPortChecker::new();
        ports.expect_is_open().returning(|_| true);
        let log = Arc::new(EventLog::in_memory());
        let (event_tx, _) = broadcast::channel(64);
        let deps = MonitorDeps {
            probe: HealthProbe::new(runner.clone(), Arc::new(ports)),
            restarter: RestartExecutor::new(runner, log.clone()),
            sleeper: Arc::new(ParkedSleeper),
            log,
            event_tx,
        };
        let services = Arc::new(ServiceRegistry::with_defaults().unwrap());
        MonitorRegistry::new(services, deps, MonitorPolicy::default())
    }

    fn healthy_runner() -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| CommandOutput::ok("active"));
        runner
    }

    #[tokio::test]
    async fn test_start_records_initial_state() {
        let registry = registry_with(healthy_runner());
        let state = registry.start("nginx", None).await.unwrap();

        assert_eq!(state.service, "nginx");
        assert_eq!(state.phase, MonitorPhase::Healthy);
        assert_eq!(state.interval, Duration::from_secs(30));
        assert!(registry.is_monitored("nginx").await);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_start() {
        let runner = Arc::new(GatedRunner::default());
        let registry = Arc::new(registry_with_runner(runner.clone()));

        let starting = tokio::spawn({
            let registry = registry.clone();
            async move { registry.start("nginx", None).await }
        });
        runner.entered.notified().await;

        let stopping = tokio::spawn({
            let registry = registry.clone();
            async move { registry.shutdown().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!stopping.is_finished());
        assert!(!registry.is_shutting_down());

        runner.release.notify_one();
        assert!(starting.await.unwrap().is_ok());
        stopping.await.unwrap();

        assert!(registry.is_shutting_down());
        assert!(registry.snapshot_all().await.is_empty());
        assert!(!registry.is_monitored("nginx").await);
        assert!(registry.start("nginx", None).await.is_err());
    }

    #[tokio::test]
    async fn test_start_unknown_service() {
        let registry = registry_with(healthy_runner());
        let err = registry.start("varnish", None).await.unwrap_err();
        assert!(matches!(err, SvcwatchError::UnknownService(_)));
    }

    #[tokio::test]
    async fn test_start_twice_is_already_monitored() {
        let registry = registry_with(healthy_runner());
        registry.start("ssh", Some(Duration::from_secs(5))).await.unwrap();
        let before = registry.snapshot("ssh").await.unwrap();

        let err = registry.start("ssh", Some(Duration::from_secs(60))).await.unwrap_err();
        assert!(matches!(err, SvcwatchError::AlreadyMonitored(_)));

        let after = registry.snapshot("ssh").await.unwrap();
        assert_eq!(after.interval, Duration::from_secs(5));
        assert_eq!(after.consecutive_failures, before.consecutive_failures);
        assert_eq!(after.restart_attempts, before.restart_attempts);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let registry = registry_with(healthy_runner());
        let err = registry.start("ssh", Some(Duration::ZERO)).await.unwrap_err();
        assert!(matches!(err, SvcwatchError::InvalidServiceConfig(_)));
        assert!(!registry.is_monitored("ssh").await);
    }

    #[tokio::test]
    async fn test_stop_unmonitored() {
        let registry = registry_with(healthy_runner());
        registry.start("redis", None).await.unwrap();

        let err = registry.stop("nginx").await.unwrap_err();
        assert!(matches!(err, SvcwatchError::NotMonitored(_)));
        assert_eq!(registry.monitored().await, vec!["redis".to_string()]);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_removes_record_and_ends_task() {
        let registry = registry_with(healthy_runner());
        let mut events = registry.subscribe();
        registry.start("mysql", None).await.unwrap();

        registry.stop("mysql").await.unwrap();
        assert!(!registry.is_monitored("mysql").await);
        assert!(registry.snapshot("mysql").await.is_err());

        loop {
            if let MonitorEvent::Stopped { service } = events.recv().await.unwrap() {
                assert_eq!(service, "mysql");
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_idempotent() {
        let registry = registry_with(healthy_runner());
        registry.start("postgresql", None).await.unwrap();

        let first = registry.snapshot("postgresql").await.unwrap();
        let second = registry.snapshot("postgresql").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.snapshot_all().await.len(), 1);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_every_task() {
        let registry = registry_with(healthy_runner());
        registry.start("ssh", None).await.unwrap();
        registry.start("docker", None).await.unwrap();

        registry.shutdown().await;

        assert!(registry.snapshot_all().await.is_empty());
        assert!(registry.start("nginx", None).await.is_err());
    }
}
