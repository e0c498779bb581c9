pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod event_log;
pub mod probe;
pub mod registry;
pub mod supervisor;

pub use config::AppConfig;
pub use control::{Controller, ControllerBuilder};
pub use error::{Result, SvcwatchError};
pub use event_log::{EventLog, LogEntry, LogLevel};
pub use probe::{CommandOutput, CommandRunner, HealthProbe, PortChecker, ProbeVerdict};
pub use registry::{ServiceConfig, ServiceRegistry};
pub use supervisor::{
    MonitorEvent, MonitorPhase, MonitorPolicy, MonitorRegistry, MonitorState, RestartExecutor,
    Sleeper,
};
