//! Health Probing
//!
//! - Shell command execution with captured exit code/stdout/stderr
//! - TCP port reachability with a bounded connect timeout
//! - Health verdict combining both

pub mod command;
pub mod health;
pub mod port;

pub use command::{CommandOutput, CommandRunner, ShellRunner, LAUNCH_FAILURE_EXIT_CODE};
pub use health::{HealthProbe, ProbeVerdict};
pub use port::{PortChecker, TcpPortChecker, DEFAULT_PORT_TIMEOUT};
