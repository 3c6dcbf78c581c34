//! Configuration handling for the API gateway.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::catalog::MEMORY_CATALOG;
use clap::Parser;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_CATALOG: &str = "sqlite:gateway.db";
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Configuration for the API gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-api-gateway",
    about = "Metadata-driven API gateway - register databases and HTTP endpoints, serve generated routes",
    version,
    author
)]
pub struct Config {
    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "GATEWAY_HOST")]
    pub host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "GATEWAY_PORT")]
    pub port: u16,

    /// Catalog store: a SQLite URL (e.g. "sqlite:gateway.db") or "memory"
    #[arg(long, value_name = "URL", default_value = DEFAULT_CATALOG, env = "GATEWAY_CATALOG")]
    pub catalog: String,

    /// Path prefix for every API route
    #[arg(long, default_value = DEFAULT_API_PREFIX, env = "GATEWAY_API_PREFIX")]
    pub api_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "GATEWAY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            catalog: DEFAULT_CATALOG.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }
        if !self.api_prefix.starts_with('/') {
            return Err(format!(
                "api prefix must start with '/', got \"{}\"",
                self.api_prefix
            ));
        }
        if !self.catalog.eq_ignore_ascii_case(MEMORY_CATALOG) && !self.catalog.starts_with("sqlite:")
        {
            return Err(format!(
                "catalog must be \"{}\" or a sqlite: URL, got \"{}\"",
                MEMORY_CATALOG, self.catalog
            ));
        }
        Ok(())
    }

    /// Route prefix without a trailing slash; empty when mounted at the root.
    pub fn normalized_prefix(&self) -> String {
        self.api_prefix.trim_end_matches('/').to_string()
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, DEFAULT_HTTP_HOST);
        assert_eq!(config.port, 5000);
        assert_eq!(config.catalog, DEFAULT_CATALOG);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "db-api-gateway",
            "--port",
            "8081",
            "--catalog",
            "memory",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.catalog, "memory");
        assert!(config.json_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let config = Config {
            port: 0,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("port"));
    }

    #[test]
    fn test_validate_rejects_relative_prefix() {
        let config = Config {
            api_prefix: "api".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_catalog() {
        let config = Config {
            catalog: "postgres://localhost/catalog".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            catalog: "MEMORY".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_prefix() {
        let config = Config {
            api_prefix: "/api/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.normalized_prefix(), "/api");

        let root = Config {
            api_prefix: "/".to_string(),
            ..Config::default()
        };
        assert_eq!(root.normalized_prefix(), "");
    }
}
