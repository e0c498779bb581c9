use crate::error::{Result, SvcwatchError};
use crate::probe::TcpPortChecker;
use crate::registry::{parse_port, ServiceConfig, ServiceRegistry};
use crate::supervisor::MonitorPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Custom services registered after the built-in ones
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Default poll interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Consecutive failures before a restart
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Restart attempts before manual intervention is required
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
    /// Seconds to wait after a restart before checking again
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_max_failures() -> u32 {
    3
}

fn default_max_restart_attempts() -> u32 {
    5
}

fn default_settle_delay_secs() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_failures: default_max_failures(),
            max_restart_attempts: default_max_restart_attempts(),
            settle_delay_secs: default_settle_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Host the port checks connect to
    #[serde(default = "default_probe_host")]
    pub host: String,
    /// Connect timeout for port checks in milliseconds
    #[serde(default = "default_port_timeout_ms")]
    pub port_timeout_ms: u64,
}

fn default_probe_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port_timeout_ms() -> u64 {
    1000
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: default_probe_host(),
            port_timeout_ms: default_port_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted console logs
    #[serde(default)]
    pub json: bool,
    /// Operator event log file
    #[serde(default = "default_event_log")]
    pub event_log: PathBuf,
    /// Directory for rolling diagnostic logs (disabled when unset)
    #[serde(default)]
    pub trace_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_log() -> PathBuf {
    PathBuf::from("service_monitor.log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            event_log: default_event_log(),
            trace_dir: None,
        }
    }
}

/// Port as written in a config file or environment variable
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

/// Custom service definition as written in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    pub id: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub port: Option<PortValue>,
    #[serde(default)]
    pub restart_command: Option<String>,
    #[serde(default)]
    pub status_command: Option<String>,
}

impl ServiceDefinition {
    /// Validate into a `ServiceConfig`
    pub fn to_service_config(&self) -> Result<ServiceConfig> {
        let port = match &self.port {
            None => None,
            Some(PortValue::Text(text)) => parse_port(text)?,
            Some(PortValue::Number(n)) => {
                let port = u16::try_from(*n).ok().filter(|p| *p != 0).ok_or_else(|| {
                    SvcwatchError::InvalidServiceConfig(format!(
                        "invalid port for {}: {}",
                        self.id, n
                    ))
                })?;
                Some(port)
            }
        };

        let mut builder = ServiceConfig::builder(&self.id).port(port);
        if let Some(unit) = &self.unit {
            builder = builder.unit(unit);
        }
        if let Some(command) = &self.restart_command {
            builder = builder.restart_command(command);
        }
        if let Some(command) = &self.status_command {
            builder = builder.status_command(command);
        }
        builder.build()
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("monitor.interval_secs", default_interval_secs() as i64)?
            .set_default("monitor.max_failures", default_max_failures() as i64)?
            .set_default("monitor.max_restart_attempts", default_max_restart_attempts() as i64)?
            .set_default("monitor.settle_delay_secs", default_settle_delay_secs() as i64)?
            .set_default("probe.host", default_probe_host())?
            .set_default("probe.port_timeout_ms", default_port_timeout_ms() as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SVCWATCH_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SVCWATCH_MONITOR__INTERVAL_SECS, etc.)
            .add_source(
                Environment::with_prefix("SVCWATCH")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Thresholds for monitor tasks
    pub fn policy(&self) -> Result<MonitorPolicy> {
        if self.monitor.interval_secs == 0 {
            return Err(SvcwatchError::InvalidServiceConfig(
                "monitor.interval_secs must be positive".to_string(),
            ));
        }
        if self.monitor.max_failures == 0 {
            return Err(SvcwatchError::InvalidServiceConfig(
                "monitor.max_failures must be at least 1".to_string(),
            ));
        }

        Ok(MonitorPolicy {
            interval: Duration::from_secs(self.monitor.interval_secs),
            max_failures: self.monitor.max_failures,
            max_restart_attempts: self.monitor.max_restart_attempts,
            settle_delay: Duration::from_secs(self.monitor.settle_delay_secs),
        })
    }

    /// Port checker for the configured host and timeout
    pub fn port_checker(&self) -> Result<TcpPortChecker> {
        let host: IpAddr = self.probe.host.parse().map_err(|_| {
            SvcwatchError::InvalidServiceConfig(format!("invalid probe host: {}", self.probe.host))
        })?;
        Ok(TcpPortChecker::new(
            host,
            Duration::from_millis(self.probe.port_timeout_ms),
        ))
    }

    /// Built-in services plus the configured custom ones
    pub async fn build_registry(&self) -> Result<ServiceRegistry> {
        let registry = ServiceRegistry::with_defaults()?;
        for definition in &self.services {
            registry.register(definition.to_service_config()?).await?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.policy().unwrap(), MonitorPolicy::default());
        assert_eq!(config.logging.event_log, PathBuf::from("service_monitor.log"));
        assert!(config.port_checker().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[monitor]
interval_secs = 15

[logging]
event_log = "/tmp/svcwatch-test.log"

[[services]]
id = "api"
unit = "api-server"
port = 8080

[[services]]
id = "worker"
port = "9100"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.monitor.interval_secs, 15);
        assert_eq!(config.monitor.max_failures, 3);
        assert_eq!(config.services.len(), 2);

        let api = config.services[0].to_service_config().unwrap();
        assert_eq!(api.unit(), "api-server");
        assert_eq!(api.port(), Some(8080));
        assert_eq!(api.restart_command(), "systemctl restart api-server");

        let worker = config.services[1].to_service_config().unwrap();
        assert_eq!(worker.port(), Some(9100));
    }

    #[test]
    fn test_invalid_ports_rejected() {
        let definition = ServiceDefinition {
            id: "api".to_string(),
            unit: None,
            port: Some(PortValue::Text("http".to_string())),
            restart_command: None,
            status_command: None,
        };
        assert!(definition.to_service_config().is_err());

        let definition = ServiceDefinition {
            port: Some(PortValue::Number(70_000)),
            ..definition
        };
        assert!(definition.to_service_config().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = AppConfig::default();
        config.monitor.interval_secs = 0;
        assert!(config.policy().is_err());
    }

    #[tokio::test]
    async fn test_duplicate_custom_service_rejected() {
        let mut config = AppConfig::default();
        config.services.push(ServiceDefinition {
            id: "nginx".to_string(),
            unit: None,
            port: None,
            restart_command: None,
            status_command: None,
        });

        let err = config.build_registry().await.unwrap_err();
        assert!(matches!(err, SvcwatchError::DuplicateId(_)));
    }
}
