//! Supervisor Layer for Service Monitoring and Recovery
//!
//! This module provides the automated supervision machinery:
//! - Monitor task per service with failure counting and restart escalation
//! - Restart executor for running restart commands
//! - Monitor registry for starting, stopping and inspecting tasks

pub mod monitor;
pub mod policy;
pub mod registry;
pub mod restart;
pub mod state;

pub use monitor::{MonitorDeps, MonitorOutcome, MonitorTask};
pub use policy::{MonitorPolicy, Sleeper, TokioSleeper};
pub use registry::MonitorRegistry;
pub use restart::RestartExecutor;
pub use state::{MonitorEvent, MonitorPhase, MonitorState};
