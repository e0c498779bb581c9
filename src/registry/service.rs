//! Service definitions
//!
//! A `ServiceConfig` is only ever produced by `ServiceConfigBuilder::build`,
//! so every registered service has a non-empty id, unit and commands and a
//! port that is either absent or a valid non-zero TCP port.

use crate::error::{Result, SvcwatchError};
use serde::Serialize;

/// Probe and restart configuration for one supervised service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfig {
    id: String,
    unit: String,
    port: Option<u16>,
    restart_command: String,
    status_command: String,
}

impl ServiceConfig {
    /// Start building a service definition for `id`
    pub fn builder(id: impl Into<String>) -> ServiceConfigBuilder {
        ServiceConfigBuilder::new(id)
    }

    /// Registry key (e.g. "ssh")
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Underlying OS service name (e.g. "sshd")
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// TCP port probed on the local host, if any
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn restart_command(&self) -> &str {
        &self.restart_command
    }

    pub fn status_command(&self) -> &str {
        &self.status_command
    }
}

/// Parse operator-supplied port text
///
/// Empty text means "no port check". Anything that is not a number in
/// `1..=65535` is rejected.
pub fn parse_port(text: &str) -> Result<Option<u16>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let port: u16 = text
        .parse()
        .map_err(|_| SvcwatchError::InvalidServiceConfig(format!("invalid port: {text:?}")))?;
    if port == 0 {
        return Err(SvcwatchError::InvalidServiceConfig(
            "port must be between 1 and 65535".to_string(),
        ));
    }
    Ok(Some(port))
}

/// Builder for `ServiceConfig`
///
/// Unset or blank fields fall back to systemd conventions: the unit defaults
/// to the id, and the commands to `systemctl restart|status <unit>`.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    id: String,
    unit: Option<String>,
    port: Option<u16>,
    restart_command: Option<String>,
    status_command: Option<String>,
}

impl ServiceConfigBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn restart_command(mut self, command: impl Into<String>) -> Self {
        self.restart_command = Some(command.into());
        self
    }

    pub fn status_command(mut self, command: impl Into<String>) -> Self {
        self.status_command = Some(command.into());
        self
    }

    /// Validate and produce the immutable definition
    pub fn build(self) -> Result<ServiceConfig> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(SvcwatchError::InvalidServiceConfig(
                "service identifier cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(SvcwatchError::InvalidServiceConfig(format!(
                "service identifier {id:?} must not contain whitespace"
            )));
        }
        if self.port == Some(0) {
            return Err(SvcwatchError::InvalidServiceConfig(
                "port must be between 1 and 65535".to_string(),
            ));
        }

        let unit = non_blank(self.unit).unwrap_or_else(|| id.clone());
        let restart_command = non_blank(self.restart_command)
            .unwrap_or_else(|| format!("systemctl restart {unit}"));
        let status_command =
            non_blank(self.status_command).unwrap_or_else(|| format!("systemctl status {unit}"));

        Ok(ServiceConfig {
            id,
            unit,
            port: self.port,
            restart_command,
            status_command,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_follow_unit() {
        let config = ServiceConfig::builder("cache")
            .unit("memcached")
            .port(Some(11211))
            .build()
            .unwrap();

        assert_eq!(config.id(), "cache");
        assert_eq!(config.unit(), "memcached");
        assert_eq!(config.port(), Some(11211));
        assert_eq!(config.restart_command(), "systemctl restart memcached");
        assert_eq!(config.status_command(), "systemctl status memcached");
    }

    #[test]
    fn test_builder_unit_defaults_to_id() {
        let config = ServiceConfig::builder("worker").unit("  ").build().unwrap();
        assert_eq!(config.unit(), "worker");
        assert_eq!(config.port(), None);
    }

    #[test]
    fn test_builder_rejects_empty_id() {
        let err = ServiceConfig::builder("   ").build().unwrap_err();
        assert!(matches!(err, SvcwatchError::InvalidServiceConfig(_)));
    }

    #[test]
    fn test_builder_rejects_port_zero() {
        let err = ServiceConfig::builder("web").port(Some(0)).build().unwrap_err();
        assert!(matches!(err, SvcwatchError::InvalidServiceConfig(_)));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("").unwrap(), None);
        assert_eq!(parse_port(" 8080 ").unwrap(), Some(8080));
        assert!(parse_port("http").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("0").is_err());
        assert!(parse_port("-1").is_err());
    }
}
