//! Catalog record models.
//!
//! These are the rows owned by the catalog store: registered REST API
//! projects, endpoint records (hand-written or generated) and domains.

use crate::db::dsn;
use crate::error::{GatewayError, GatewayResult};
use crate::models::EngineKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

pub const DEFAULT_ENDPOINT_STATUS: &str = "Develop";

fn serialize_masked_dsn<S: Serializer>(dsn: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&dsn::mask(dsn))
}

/// A registered REST API project (an external database).
///
/// Two password representations are stored on purpose: `password_hash` is an
/// Argon2 digest for display/audit, while `dsn` embeds the plaintext so new
/// connections can be opened. Both are written once, at creation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: i64,
    pub uuid: String,
    pub project_name: String,
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password_hash: Option<String>,
    pub database_name: String,
    /// Contains the plaintext password - masked on serialization, never log
    #[serde(serialize_with = "serialize_masked_dsn")]
    pub dsn: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// Get a display-safe version of the DSN.
    pub fn masked_dsn(&self) -> String {
        dsn::mask(&self.dsn)
    }
}

/// Insert payload for a project; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub uuid: String,
    pub project_name: String,
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password_hash: Option<String>,
    pub database_name: String,
    pub dsn: String,
}

/// Table backing a generated endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSource {
    /// Project UUID
    pub project: String,
    pub table: String,
}

/// How a synthesized route is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSource {
    /// Forward GET requests to a stored base URL.
    StaticHttp { base_url: String },
    /// Read rows from a table of a registered project.
    DynamicTable(TableSource),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    pub id: i64,
    pub base_url: String,
    pub method: String,
    pub path: String,
    pub description: String,
    pub status: String,
    pub websites: Vec<String>,
    /// Best-effort structural snapshot; not kept in sync with the source schema.
    pub response: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_source: Option<TableSource>,
}

impl EndpointRecord {
    pub fn source(&self) -> EndpointSource {
        match &self.table_source {
            Some(table) => EndpointSource::DynamicTable(table.clone()),
            None => EndpointSource::StaticHttp {
                base_url: self.base_url.clone(),
            },
        }
    }
}

/// Insert/update payload for an endpoint; the store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEndpoint {
    pub base_url: String,
    pub method: String,
    pub path: String,
    pub description: String,
    pub status: String,
    pub websites: Vec<String>,
    pub response: JsonValue,
    pub table_source: Option<TableSource>,
}

impl NewEndpoint {
    pub fn into_record(self, id: i64) -> EndpointRecord {
        EndpointRecord {
            id,
            base_url: self.base_url,
            method: self.method,
            path: self.path,
            description: self.description,
            status: self.status,
            websites: self.websites,
            response: self.response,
            table_source: self.table_source,
        }
    }
}

/// Endpoint fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPayload {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub websites: Vec<String>,
    pub response: Option<JsonValue>,
}

impl EndpointPayload {
    /// Validate required fields and apply defaults.
    pub fn validate(self) -> GatewayResult<NewEndpoint> {
        let missing: Vec<&str> = [
            ("baseUrl", &self.base_url),
            ("method", &self.method),
            ("path", &self.path),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(GatewayError::missing_fields(missing));
        }

        Ok(NewEndpoint {
            base_url: self.base_url.trim().to_string(),
            method: self.method.trim().to_uppercase(),
            path: self.path.trim().to_string(),
            description: self.description.unwrap_or_default(),
            status: self
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT_STATUS.to_string()),
            websites: self.websites,
            response: self
                .response
                .unwrap_or_else(|| JsonValue::Object(Default::default())),
            table_source: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainRecord {
    pub id: i64,
    pub url: String,
}
