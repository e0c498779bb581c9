//! Monitor lifecycle phases, published snapshots and events

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Lifecycle phase of a monitor task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "failures", rename_all = "snake_case")]
pub enum MonitorPhase {
    /// Last check passed
    Healthy,
    /// Consecutive failures below the restart threshold
    Degraded(u32),
    /// A restart was attempted in the current iteration
    Restarting,
    /// Restart attempts exhausted; needs manual intervention
    Escalated,
    /// Monitoring was stopped
    Stopped,
}

impl MonitorPhase {
    pub fn is_healthy(&self) -> bool {
        matches!(self, MonitorPhase::Healthy)
    }
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorPhase::Healthy => write!(f, "running"),
            MonitorPhase::Degraded(0) => write!(f, "not running"),
            MonitorPhase::Degraded(n) => write!(f, "degraded ({n})"),
            MonitorPhase::Restarting => write!(f, "restarting"),
            MonitorPhase::Escalated => write!(f, "failed - manual intervention required"),
            MonitorPhase::Stopped => write!(f, "monitoring stopped"),
        }
    }
}

/// Read-only snapshot of a monitor task's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorState {
    pub service: String,
    pub phase: MonitorPhase,
    pub consecutive_failures: u32,
    pub restart_attempts: u32,
    /// Successful restarts since monitoring started, manual ones included
    pub restart_count: u32,
    pub last_check: DateTime<Utc>,
    pub last_restart: Option<DateTime<Utc>>,
    #[serde(rename = "interval_secs", serialize_with = "serialize_secs")]
    pub interval: Duration,
    /// Detail text of the most recent check
    pub last_detail: String,
}

impl MonitorState {
    /// State recorded from the immediate check made when monitoring starts
    ///
    /// The initial check does not count as a failure.
    pub fn initial(service: impl Into<String>, healthy: bool, detail: String, interval: Duration) -> Self {
        Self {
            service: service.into(),
            phase: if healthy {
                MonitorPhase::Healthy
            } else {
                MonitorPhase::Degraded(0)
            },
            consecutive_failures: 0,
            restart_attempts: 0,
            restart_count: 0,
            last_check: Utc::now(),
            last_restart: None,
            interval,
            last_detail: detail,
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Event emitted by monitor tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Monitoring started
    Started { service: String, healthy: bool },
    /// A check failed below the restart threshold
    Degraded {
        service: String,
        failures: u32,
        max_failures: u32,
    },
    /// Attempting a restart
    RestartAttempt { service: String, attempt: u32 },
    /// Restart command succeeded
    RestartSucceeded { service: String },
    /// Restart command failed
    RestartFailed { service: String, attempt: u32 },
    /// Restart attempts exhausted, task terminated
    Escalated {
        service: String,
        failures: u32,
        attempts: u32,
    },
    /// Task terminated after a stop request or process shutdown
    Stopped { service: String },
}

impl MonitorEvent {
    pub fn service(&self) -> &str {
        match self {
            MonitorEvent::Started { service, .. }
            | MonitorEvent::Degraded { service, .. }
            | MonitorEvent::RestartAttempt { service, .. }
            | MonitorEvent::RestartSucceeded { service }
            | MonitorEvent::RestartFailed { service, .. }
            | MonitorEvent::Escalated { service, .. }
            | MonitorEvent::Stopped { service } => service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(MonitorPhase::Healthy.to_string(), "running");
        assert_eq!(MonitorPhase::Degraded(0).to_string(), "not running");
        assert_eq!(MonitorPhase::Degraded(2).to_string(), "degraded (2)");
        assert_eq!(
            MonitorPhase::Escalated.to_string(),
            "failed - manual intervention required"
        );
    }

    #[test]
    fn test_phase_checks() {
        assert!(MonitorPhase::Healthy.is_healthy());
        assert!(!MonitorPhase::Degraded(1).is_healthy());
    }

    #[test]
    fn test_initial_state() {
        let state = MonitorState::initial("nginx", false, "inactive".into(), Duration::from_secs(30));
        assert_eq!(state.phase, MonitorPhase::Degraded(0));
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.restart_count, 0);
        assert!(state.last_restart.is_none());
    }

    #[test]
    fn test_state_serializes_interval_in_seconds() {
        let state = MonitorState::initial("ssh", true, String::new(), Duration::from_secs(45));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["interval_secs"], 45.0);
        assert_eq!(json["phase"]["phase"], "healthy");
    }
}
