//! Output formatting for CLI commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use crate::event_log::LogLevel;
use crate::registry::ServiceConfig;
use crate::supervisor::MonitorState;
use chrono::Local;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Print a single Serialize item as JSON.
pub fn print_item<T: Serialize>(item: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
pub struct ServiceRow {
    #[tabled(rename = "SERVICE")]
    pub id: String,
    #[tabled(rename = "UNIT")]
    pub unit: String,
    #[tabled(rename = "PORT")]
    pub port: String,
    #[tabled(rename = "STATUS COMMAND")]
    pub status_command: String,
}

impl From<&ServiceConfig> for ServiceRow {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            id: config.id().to_string(),
            unit: config.unit().to_string(),
            port: config
                .port()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status_command: config.status_command().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct DashboardRow {
    #[tabled(rename = "SERVICE")]
    pub service: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "FAILURES")]
    pub failures: u32,
    #[tabled(rename = "LAST CHECK")]
    pub last_check: String,
    #[tabled(rename = "LAST RESTART")]
    pub last_restart: String,
    #[tabled(rename = "RESTARTS")]
    pub restarts: u32,
}

impl From<&MonitorState> for DashboardRow {
    fn from(state: &MonitorState) -> Self {
        let local = |t: chrono::DateTime<chrono::Utc>| {
            t.with_timezone(&Local)
                .format(crate::event_log::TIMESTAMP_FORMAT)
                .to_string()
        };
        Self {
            service: state.service.clone(),
            status: state.phase.to_string(),
            failures: state.consecutive_failures,
            last_check: local(state.last_check),
            last_restart: state
                .last_restart
                .map(local)
                .unwrap_or_else(|| "Never".to_string()),
            restarts: state.restart_count,
        }
    }
}

/// ANSI colour for a log level
pub fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "\x1b[31m",
        LogLevel::Warning => "\x1b[33m",
        LogLevel::Success => "\x1b[32m",
        LogLevel::Info => "\x1b[37m",
    }
}

/// Colour a persisted log line by its level tag
pub fn colorize_line(line: &str) -> String {
    format!("{}{}\x1b[0m", level_color(LogLevel::classify(line)), line)
}
