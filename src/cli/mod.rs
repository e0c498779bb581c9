//! svcwatch CLI
//!
//! Commands:
//! - `svcwatch services` - List configured services
//! - `svcwatch status` - Check a service once
//! - `svcwatch restart` - Restart a service now
//! - `svcwatch logs` - View the event log
//! - `svcwatch monitor` - Monitor services until interrupted

pub mod output;
pub mod service;

use clap::Parser;
use std::path::PathBuf;

pub use service::ServiceCommands;

use crate::error::SvcwatchError;

/// Exit status for a command that failed with `err`
///
/// Misuse (unknown service, already monitored, bad service definition)
/// exits with 2 like clap's own usage errors; everything else exits with 1.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SvcwatchError>() {
        Some(e) if e.is_usage_error() => 2,
        _ => 1,
    }
}

/// Service monitor and auto-restarter
#[derive(Parser, Debug)]
#[command(name = "svcwatch")]
#[command(author, version, about = "Monitor services and restart them when they fail")]
pub struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(long, global = true, env = "SVCWATCH_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: ServiceCommands,
}
