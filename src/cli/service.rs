//! Service commands
//!
//! svcwatch services              - List configured services
//! svcwatch status <service>      - Check a service once
//! svcwatch restart <service>     - Restart a service now
//! svcwatch logs                  - View the event log
//! svcwatch monitor <service>...  - Monitor services until interrupted

use super::output::{self, DashboardRow, OutputMode, ServiceRow};
use crate::control::Controller;
use crate::supervisor::MonitorEvent;
use anyhow::Result;
use clap::Subcommand;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Service-related commands
#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// List configured services
    Services {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check the status of a service once
    Status {
        /// Service name
        service: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Restart a service immediately
    Restart {
        /// Service name
        service: String,
    },

    /// View the event log
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "20")]
        lines: usize,
    },

    /// Monitor services and restart them when they fail
    Monitor {
        /// Services to monitor
        #[arg(required = true)]
        services: Vec<String>,

        /// Check interval in seconds (default from configuration)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Dashboard refresh period in seconds
        #[arg(long, default_value = "5")]
        refresh: u64,

        /// Print dashboard snapshots as JSON
        #[arg(long)]
        json: bool,
    },
}

impl ServiceCommands {
    /// Run the command; `shutdown` resolves when the process should exit
    pub async fn run<S>(self, controller: &Controller, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        match self {
            Self::Services { json } => list_services(controller, OutputMode::from_json_flag(json)).await,
            Self::Status { service, json } => show_status(controller, &service, json).await,
            Self::Restart { service } => restart_service(controller, &service).await,
            Self::Logs { lines } => show_logs(controller, lines),
            Self::Monitor {
                services,
                interval,
                refresh,
                json,
            } => {
                let interval = interval.filter(|secs| *secs > 0).map(Duration::from_secs);
                let refresh = Duration::from_secs(refresh.max(1));
                run_monitor(
                    controller,
                    &services,
                    interval,
                    refresh,
                    OutputMode::from_json_flag(json),
                    shutdown,
                )
                .await
            }
        }
    }
}

async fn list_services(controller: &Controller, mode: OutputMode) -> Result<()> {
    let rows: Vec<ServiceRow> = controller
        .list_services()
        .await
        .iter()
        .map(|config| ServiceRow::from(config.as_ref()))
        .collect();
    output::print_items(&rows, mode)
}

async fn show_status(controller: &Controller, service: &str, json: bool) -> Result<()> {
    let verdict = controller.get_status(service).await?;

    if json {
        return output::print_item(&verdict);
    }

    if verdict.healthy {
        println!("Status: \x1b[32mRunning\x1b[0m");
    } else {
        println!("Status: \x1b[31mNot running\x1b[0m");
    }
    println!("Details:");
    println!("{}", verdict.detail.trim_end());
    Ok(())
}

async fn restart_service(controller: &Controller, service: &str) -> Result<()> {
    println!("Manually restarting {}...", service);

    if controller.restart_now(service).await? {
        println!("\x1b[32m✓ Successfully restarted {}\x1b[0m", service);
        Ok(())
    } else {
        anyhow::bail!("failed to restart {service}")
    }
}

fn show_logs(controller: &Controller, lines: usize) -> Result<()> {
    let entries = controller.event_log().tail(lines)?;
    if entries.is_empty() {
        println!("Log file is empty");
        return Ok(());
    }

    println!("Last {} log entries:", entries.len());
    for line in entries {
        println!("{}", output::colorize_line(&line));
    }
    Ok(())
}

async fn run_monitor<S>(
    controller: &Controller,
    services: &[String],
    interval: Option<Duration>,
    refresh: Duration,
    mode: OutputMode,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()>,
{
    controller.event_log().info("Service monitor started");

    let mut started = 0;
    for service in services {
        match controller.start_monitoring(service, interval).await {
            Ok(state) => {
                started += 1;
                debug!("Monitoring {} (initially {})", service, state.phase);
            }
            Err(e) => eprintln!("\x1b[31m✗ {}\x1b[0m", e),
        }
    }
    if started == 0 {
        anyhow::bail!("no services could be monitored");
    }

    let mut events = controller.subscribe();
    let mut ticker = tokio::time::interval(refresh);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                println!("\nShutting down service monitor...");
                break;
            }
            _ = ticker.tick() => {
                let states = controller.dashboard_snapshot().await;
                if states.is_empty() {
                    println!("No services currently being monitored");
                    break;
                }
                let rows: Vec<DashboardRow> = states.iter().map(DashboardRow::from).collect();
                output::print_items(&rows, mode)?;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(notice) = event_notice(&event) {
                        eprintln!("{}", notice);
                    }
                }
                Err(e) => warn!("Dashboard missed monitor events: {}", e),
            },
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// One-line notice printed under the dashboard for noteworthy events
fn event_notice(event: &MonitorEvent) -> Option<String> {
    match event {
        MonitorEvent::Escalated { .. } => Some(format!(
            "\x1b[31m✗ {} requires manual intervention\x1b[0m",
            event.service()
        )),
        MonitorEvent::RestartSucceeded { .. } => Some(format!(
            "\x1b[32m✓ {} restarted\x1b[0m",
            event.service()
        )),
        _ => None,
    }
}
