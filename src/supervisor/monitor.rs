//! Per-service monitor task
//!
//! Each task owns its counters and publishes copies of its state through a
//! `watch` channel. One loop iteration:
//!
//! 1. Probe the service.
//! 2. Healthy: reset both counters, sleep `interval`.
//! 3. Unhealthy: bump the failure counter.
//!    - below `max_failures`: Degraded, sleep `interval / 2`
//!    - at/over `max_failures` with attempts exhausted: Escalated, exit
//!    - otherwise restart; success resets the failure counter. Sleep
//!      `settle_delay` either way.
//!
//! A failed restart leaves both counters alone, so exhaustion is only
//! detected on the next failed probe.
//!
//! Cancellation is observed at loop boundaries: before a probe and while
//! sleeping. A probe or restart that is already running is never interrupted.

use super::policy::{MonitorPolicy, Sleeper};
use super::restart::RestartExecutor;
use super::state::{MonitorEvent, MonitorPhase, MonitorState};
use crate::event_log::EventLog;
use crate::probe::{HealthProbe, ProbeVerdict};
use crate::registry::ServiceConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a monitor task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Stop request or process shutdown
    Stopped,
    /// Restart attempts exhausted
    Escalated,
}

/// Messages from the registry to a running task
#[derive(Debug, Clone)]
pub enum TaskCommand {
    /// The service was restarted by hand while being monitored
    RecordManualRestart { at: DateTime<Utc> },
}

/// Collaborators shared by every monitor task
#[derive(Clone)]
pub struct MonitorDeps {
    pub probe: HealthProbe,
    pub restarter: RestartExecutor,
    pub sleeper: Arc<dyn Sleeper>,
    pub log: Arc<EventLog>,
    pub event_tx: broadcast::Sender<MonitorEvent>,
}

/// Registry-side ends of a task's channels
#[derive(Debug)]
pub struct MonitorLink {
    pub state_rx: watch::Receiver<MonitorState>,
    pub command_tx: mpsc::UnboundedSender<TaskCommand>,
}

enum Step {
    Continue(Duration),
    Escalated,
}

/// State machine driving one monitored service
pub struct MonitorTask {
    config: Arc<ServiceConfig>,
    policy: MonitorPolicy,
    deps: MonitorDeps,
    cancel: CancellationToken,
    state: MonitorState,
    state_tx: watch::Sender<MonitorState>,
    commands: mpsc::UnboundedReceiver<TaskCommand>,
}

impl MonitorTask {
    /// Create a task whose initial state comes from `initial`
    pub fn new(
        config: Arc<ServiceConfig>,
        policy: MonitorPolicy,
        deps: MonitorDeps,
        initial: &ProbeVerdict,
        cancel: CancellationToken,
    ) -> (Self, MonitorLink) {
        let state = MonitorState::initial(
            config.id(),
            initial.healthy,
            initial.detail.clone(),
            policy.interval,
        );
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (command_tx, commands) = mpsc::unbounded_channel();

        let task = Self {
            config,
            policy,
            deps,
            cancel,
            state,
            state_tx,
            commands,
        };
        (task, MonitorLink { state_rx, command_tx })
    }

    /// Run until stopped or escalated
    pub async fn run(mut self) -> MonitorOutcome {
        self.deps
            .log
            .info(format!("Starting monitoring for {}", self.config.id()));
        self.emit(MonitorEvent::Started {
            service: self.config.id().to_string(),
            healthy: self.state.phase.is_healthy(),
        });

        loop {
            if self.cancel.is_cancelled() {
                return self.finish_stopped();
            }
            self.drain_commands();

            let delay = match self.step().await {
                Step::Continue(delay) => delay,
                Step::Escalated => return MonitorOutcome::Escalated,
            };

            if !self.pause(delay).await {
                return self.finish_stopped();
            }
        }
    }

    async fn step(&mut self) -> Step {
        let verdict = self.deps.probe.check(&self.config).await;
        self.state.last_check = Utc::now();
        self.state.last_detail = verdict.detail;

        if verdict.healthy {
            self.state.consecutive_failures = 0;
            self.state.restart_attempts = 0;
            self.state.phase = MonitorPhase::Healthy;
            self.publish();
            return Step::Continue(self.policy.interval);
        }

        self.state.consecutive_failures += 1;
        let failures = self.state.consecutive_failures;
        let id = self.config.id().to_string();

        if failures < self.policy.max_failures {
            self.state.phase = MonitorPhase::Degraded(failures);
            self.publish();
            self.deps.log.warning(format!(
                "Service {} appears to be down (failure {}/{})",
                id, failures, self.policy.max_failures
            ));
            self.emit(MonitorEvent::Degraded {
                service: id,
                failures,
                max_failures: self.policy.max_failures,
            });
            return Step::Continue(self.policy.degraded_interval());
        }

        if self.state.restart_attempts >= self.policy.max_restart_attempts {
            self.deps.log.error(format!(
                "Service {} has failed {} times and reached maximum restart attempts ({})",
                id, failures, self.policy.max_restart_attempts
            ));
            self.deps
                .log
                .error(format!("Manual intervention required for {}", id));
            self.state.phase = MonitorPhase::Escalated;
            self.publish();
            self.emit(MonitorEvent::Escalated {
                service: id,
                failures,
                attempts: self.state.restart_attempts,
            });
            return Step::Escalated;
        }

        self.state.restart_attempts += 1;
        let attempt = self.state.restart_attempts;
        self.state.phase = MonitorPhase::Restarting;
        self.publish();
        self.emit(MonitorEvent::RestartAttempt {
            service: id.clone(),
            attempt,
        });

        if self.deps.restarter.restart(&self.config).await {
            self.state.consecutive_failures = 0;
            self.state.restart_count += 1;
            self.state.last_restart = Some(Utc::now());
            // The next probe confirms it
            self.state.phase = MonitorPhase::Healthy;
            self.publish();
            self.emit(MonitorEvent::RestartSucceeded { service: id });
        } else {
            self.emit(MonitorEvent::RestartFailed {
                service: id,
                attempt,
            });
        }

        Step::Continue(self.policy.settle_delay)
    }

    /// Sleep for `delay`; false when cancelled first
    async fn pause(&mut self, delay: Duration) -> bool {
        let sleeper = self.deps.sleeper.clone();
        let cancel = self.cancel.clone();
        let sleep = sleeper.sleep(delay);
        tokio::pin!(sleep);

        let mut commands_open = true;
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = &mut sleep => return true,
                command = self.commands.recv(), if commands_open => command,
            };

            match command {
                Some(command) => self.apply(command),
                None => commands_open = false,
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: TaskCommand) {
        match command {
            TaskCommand::RecordManualRestart { at } => {
                self.state.restart_count += 1;
                self.state.last_restart = Some(at);
                self.publish();
                debug!("Recorded manual restart of {}", self.config.id());
            }
        }
    }

    fn finish_stopped(mut self) -> MonitorOutcome {
        self.state.phase = MonitorPhase::Stopped;
        self.publish();
        self.emit(MonitorEvent::Stopped {
            service: self.config.id().to_string(),
        });
        info!("Monitor task for {} exited", self.config.id());
        MonitorOutcome::Stopped
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn emit(&self, event: MonitorEvent) {
        let _ = self.deps.event_tx.send(event);
    }
}
