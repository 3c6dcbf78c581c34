//! Connection-related data models.
//!
//! This module defines the resolved connection target used by the connection
//! manager, and the user-facing input it is validated from.

use crate::db::engines;
use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

/// Supported target database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Includes MariaDB
    MySQL,
    PostgreSQL,
}

impl EngineKind {
    /// Parse an engine from its name or DSN scheme (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySQL),
            "postgresql" | "postgres" => Some(Self::PostgreSQL),
            _ => None,
        }
    }

    /// Scheme used when encoding a DSN.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::PostgreSQL => "postgresql",
        }
    }

    /// Get the display name for this engine.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A fully resolved connection target.
///
/// Built from user input or decoded from a stored DSN. Passed explicitly into
/// every connection manager call; nothing is read from process-wide settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    /// `None` when no password is used. Never `Some("")`.
    pub password: Option<String>,
    pub database: String,
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("database", &self.database)
            .finish()
    }
}

/// Port as sent by clients: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Resolve to a valid TCP port. `Ok(None)` means "use the engine default".
    pub fn resolve(&self) -> GatewayResult<Option<u16>> {
        let raw = match self {
            Self::Number(n) => *n,
            Self::Text(s) if s.trim().is_empty() => return Ok(None),
            Self::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                GatewayError::invalid_input(format!("port must be a positive integer, got \"{s}\""))
            })?,
        };
        if !(1..=i64::from(u16::MAX)).contains(&raw) {
            return Err(GatewayError::invalid_input(format!(
                "port must be between 1 and {}, got {raw}",
                u16::MAX
            )));
        }
        Ok(Some(raw as u16))
    }
}

/// Connection fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptorInput {
    #[serde(default)]
    pub engine: String,
    #[serde(default, alias = "host")]
    pub ip: String,
    #[serde(default)]
    pub port: Option<PortValue>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "databaseName")]
    pub database_name: String,
}

impl DescriptorInput {
    /// Names of required fields that are empty after trimming.
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("engine", &self.engine),
            ("ip", &self.ip),
            ("username", &self.username),
            ("database_name", &self.database_name),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Validate and resolve into a connection descriptor.
    ///
    /// The port falls back to the engine's default from the engine catalog.
    pub fn resolve(&self) -> GatewayResult<ConnectionDescriptor> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(GatewayError::missing_fields(missing));
        }
        self.resolve_unchecked()
    }

    fn resolve_unchecked(&self) -> GatewayResult<ConnectionDescriptor> {
        let profile = engines::lookup(&self.engine)?;
        let port = match &self.port {
            Some(p) => p.resolve()?.unwrap_or(profile.default_port),
            None => profile.default_port,
        };

        Ok(ConnectionDescriptor {
            engine: profile.engine,
            host: self.ip.trim().to_string(),
            port,
            username: self.username.trim().to_string(),
            // The password is taken verbatim: whitespace may be significant.
            password: Some(self.password.clone()).filter(|p| !p.is_empty()),
            database: self.database_name.trim().to_string(),
        })
    }
}

/// Input for registering a REST API project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectRegistration {
    #[serde(default, rename = "projectName")]
    pub project_name: String,
    #[serde(flatten)]
    pub target: DescriptorInput,
}

impl ProjectRegistration {
    /// Validate all required fields and resolve the connection descriptor.
    pub fn validate(&self) -> GatewayResult<(String, ConnectionDescriptor)> {
        let mut missing = Vec::new();
        if self.project_name.trim().is_empty() {
            missing.push("projectName");
        }
        missing.extend(self.target.missing_fields());
        if !missing.is_empty() {
            return Err(GatewayError::missing_fields(missing));
        }

        let descriptor = self.target.resolve_unchecked()?;
        Ok((self.project_name.trim().to_string(), descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration(value: serde_json::Value) -> ProjectRegistration {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_engine_from_name() {
        assert_eq!(EngineKind::from_name("MySQL"), Some(EngineKind::MySQL));
        assert_eq!(EngineKind::from_name("mariadb"), Some(EngineKind::MySQL));
        assert_eq!(EngineKind::from_name("PostgreSQL"), Some(EngineKind::PostgreSQL));
        assert_eq!(EngineKind::from_name(" postgres "), Some(EngineKind::PostgreSQL));
        assert_eq!(EngineKind::from_name("oracle"), None);
    }

    #[test]
    fn test_registration_defaults_port_from_engine() {
        let reg = registration(json!({
            "projectName": " shop ",
            "engine": "MySQL",
            "ip": "db.local",
            "username": "root",
            "database_name": "sales"
        }));
        let (name, descriptor) = reg.validate().unwrap();
        assert_eq!(name, "shop");
        assert_eq!(descriptor.engine, EngineKind::MySQL);
        assert_eq!(descriptor.port, 3306);
        assert_eq!(descriptor.password, None);
    }

    #[test]
    fn test_registration_accepts_string_port() {
        let reg = registration(json!({
            "projectName": "p",
            "engine": "postgresql",
            "ip": "10.0.0.5",
            "port": "6543",
            "username": "app",
            "password": "secret",
            "database_name": "main"
        }));
        let (_, descriptor) = reg.validate().unwrap();
        assert_eq!(descriptor.port, 6543);
        assert_eq!(descriptor.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_registration_reports_all_missing_fields() {
        let reg = registration(json!({ "engine": "MySQL", "username": "  " }));
        match reg.validate() {
            Err(GatewayError::MissingFields { fields }) => {
                assert_eq!(fields, vec!["projectName", "ip", "username", "database_name"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_registration_unknown_engine() {
        let reg = registration(json!({
            "projectName": "p",
            "engine": "oracle",
            "ip": "h",
            "username": "u",
            "database_name": "d"
        }));
        assert!(matches!(
            reg.validate(),
            Err(GatewayError::EngineNotFound { .. })
        ));
    }

    #[test]
    fn test_port_validation() {
        assert_eq!(PortValue::Number(5432).resolve().unwrap(), Some(5432));
        assert_eq!(PortValue::Text("".into()).resolve().unwrap(), None);
        assert!(PortValue::Number(0).resolve().is_err());
        assert!(PortValue::Number(70000).resolve().is_err());
        assert!(PortValue::Text("abc".into()).resolve().is_err());
        assert!(PortValue::Number(-1).resolve().is_err());
    }

    #[test]
    fn test_descriptor_debug_masks_password() {
        let descriptor = ConnectionDescriptor {
            engine: EngineKind::MySQL,
            host: "h".into(),
            port: 3306,
            username: "u".into(),
            password: Some("hunter2".into()),
            database: "d".into(),
        };
        let debug = format!("{descriptor:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("****"));
    }
}
