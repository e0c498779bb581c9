use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use svcwatch::cli::{exit_status, Cli};
use svcwatch::config::{AppConfig, LoggingConfig};
use svcwatch::control::Controller;
use svcwatch::event_log::{self, EventLog};
use tokio::signal;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load_from(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            let message = format!(
                "failed to load configuration from {}: {}",
                cli.config_dir.display(),
                e
            );
            // The configured log path is unknown, so fall back to the default one
            event_log::record_fatal(&LoggingConfig::default().event_log, &message);
            eprintln!("\x1b[31mError: {}\x1b[0m", message);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    let log = match EventLog::open(&config.logging.event_log) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            error!("Cannot open event log {}: {}", config.logging.event_log.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &config, log.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(format!("Fatal error: {}", e));
            eprintln!("\x1b[31mError: {}\x1b[0m", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli, config: &AppConfig, log: Arc<EventLog>) -> anyhow::Result<()> {
    let controller = Controller::from_config(config, log).await?;
    debug!("Loaded {} services", controller.list_services().await.len());
    cli.command.run(&controller, shutdown_signal()).await
}

fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,svcwatch={}", config.level)));

    // `tracing_appender::rolling::daily` panics if it can't create the first
    // file, so check the directory is writable before handing it over.
    let file_layer = config.trace_dir.as_ref().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            return None;
        }

        let test_path = dir.join(".svcwatch_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(dir, "svcwatch.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Flushes on drop; the process keeps logging until exit
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    dir.display(),
                    e
                );
                None
            }
        }
    });

    let (json_layer, text_layer) = if config.json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            ),
            None,
        )
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
