use std::sync::Arc;
use svcwatch::{AppConfig, Controller, EventLog, SvcwatchError};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn configured_services_follow_builtins() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("default.toml"),
        r#"
[[services]]
id = "api"
port = "8080"
status_command = "curl -sf http://127.0.0.1:8080/health"
"#,
    )
    .unwrap();

    let config = assert_ok!(AppConfig::load_from(dir.path()));
    let controller = assert_ok!(
        Controller::from_config(&config, Arc::new(EventLog::in_memory())).await
    );

    let services = controller.list_services().await;
    let ids: Vec<&str> = services.iter().map(|s| s.id()).collect();
    assert_eq!(
        ids,
        vec!["ssh", "nginx", "apache", "mysql", "postgresql", "mongodb", "redis", "docker", "api"]
    );

    let api = services.last().unwrap();
    assert_eq!(api.port(), Some(8080));
    assert_eq!(api.restart_command(), "systemctl restart api");
    assert_eq!(api.status_command(), "curl -sf http://127.0.0.1:8080/health");
}

#[tokio::test]
async fn configured_duplicate_of_builtin_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("default.toml"),
        r#"
[[services]]
id = "redis"
"#,
    )
    .unwrap();

    let config = assert_ok!(AppConfig::load_from(dir.path()));
    let err = assert_err!(
        Controller::from_config(&config, Arc::new(EventLog::in_memory())).await
    );
    assert!(matches!(err, SvcwatchError::DuplicateId(_)));
}

#[test]
fn zero_interval_is_rejected() {
    let mut config = AppConfig::default();
    config.monitor.interval_secs = 0;
    assert_err!(config.policy());
}
