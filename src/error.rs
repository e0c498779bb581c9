use thiserror::Error;

/// Main error type for the service monitor
///
/// Only configuration-level misuse surfaces here. Failed probes, commands
/// that cannot be launched and escalated services are ordinary values
/// (`ProbeVerdict`, `CommandOutput`, `MonitorPhase::Escalated`).
#[derive(Error, Debug)]
pub enum SvcwatchError {
    // Registry errors
    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Service already registered: {0}")]
    DuplicateId(String),

    #[error("Invalid service configuration: {0}")]
    InvalidServiceConfig(String),

    // Monitoring state conflicts
    #[error("Service {0} is already being monitored")]
    AlreadyMonitored(String),

    #[error("Service {0} is not currently being monitored")]
    NotMonitored(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SvcwatchError {
    /// True for errors caused by how the caller used the registry, as opposed
    /// to environment failures
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SvcwatchError::UnknownService(_)
                | SvcwatchError::DuplicateId(_)
                | SvcwatchError::InvalidServiceConfig(_)
                | SvcwatchError::AlreadyMonitored(_)
                | SvcwatchError::NotMonitored(_)
        )
    }
}

/// Result type alias for SvcwatchError
pub type Result<T> = std::result::Result<T, SvcwatchError>;
