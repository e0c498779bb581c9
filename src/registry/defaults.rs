//! Built-in service definitions shipped as seed data

use super::service::ServiceConfig;
use crate::error::Result;

/// (id, systemd unit, port)
const BUILTIN_SERVICES: &[(&str, &str, Option<u16>)] = &[
    ("ssh", "sshd", Some(22)),
    ("nginx", "nginx", Some(80)),
    ("apache", "apache2", Some(80)),
    ("mysql", "mysql", Some(3306)),
    ("postgresql", "postgresql", Some(5432)),
    ("mongodb", "mongod", Some(27017)),
    ("redis", "redis-server", Some(6379)),
    ("docker", "docker", None),
];

/// Built-in definitions in their canonical listing order
pub fn builtin_services() -> Result<Vec<ServiceConfig>> {
    BUILTIN_SERVICES
        .iter()
        .map(|(id, unit, port)| ServiceConfig::builder(*id).unit(*unit).port(*port).build())
        .collect()
}
