use super::CatalogStore;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{
    DomainRecord, EndpointRecord, EngineKind, NewEndpoint, NewProject, ProjectRecord, TableSource,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        project_name TEXT NOT NULL,
        engine TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        username TEXT NOT NULL,
        password_hash TEXT,
        database_name TEXT NOT NULL,
        dsn TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS endpoints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        base_url TEXT NOT NULL,
        method TEXT NOT NULL,
        path TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        websites TEXT NOT NULL DEFAULT '[]',
        response TEXT NOT NULL DEFAULT '{}',
        source_project TEXT,
        source_table TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS domains (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE
    )
    "#,
];

const PROJECT_COLUMNS: &str = "id, uuid, project_name, engine, host, port, username, \
     password_hash, database_name, dsn, created_at";

const ENDPOINT_COLUMNS: &str = "id, base_url, method, path, description, status, websites, \
     response, source_project, source_table";

/// Catalog backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

fn storage_error(err: sqlx::Error) -> GatewayError {
    GatewayError::internal(format!("Catalog storage error: {err}"))
}

fn encode_json<T: serde::Serialize>(value: &T) -> GatewayResult<String> {
    serde_json::to_string(value)
        .map_err(|e| GatewayError::internal(format!("Failed to encode catalog value: {e}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> GatewayResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| GatewayError::internal(format!("Corrupt catalog value: {e}")))
}

impl SqliteCatalog {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> GatewayResult<Self> {
        if !url.starts_with("sqlite:") {
            return Err(GatewayError::invalid_input(format!(
                "Catalog URL must start with sqlite: (got {url})"
            )));
        }
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| GatewayError::invalid_input(format!("Invalid catalog URL: {e}")))?
            .create_if_missing(true);

        // Each connection to `:memory:` is its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        let catalog = Self { pool };
        catalog.migrate().await?;
        Ok(catalog)
    }

    async fn migrate(&self) -> GatewayResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;
        }
        debug!("Catalog schema ready");
        Ok(())
    }

    fn project_from_row(row: &SqliteRow) -> GatewayResult<ProjectRecord> {
        let engine: String = row.try_get("engine").map_err(storage_error)?;
        let port: i64 = row.try_get("port").map_err(storage_error)?;
        Ok(ProjectRecord {
            id: row.try_get("id").map_err(storage_error)?,
            uuid: row.try_get("uuid").map_err(storage_error)?,
            project_name: row.try_get("project_name").map_err(storage_error)?,
            engine: EngineKind::from_name(&engine)
                .ok_or_else(|| GatewayError::internal(format!("Unknown stored engine {engine}")))?,
            host: row.try_get("host").map_err(storage_error)?,
            port: u16::try_from(port)
                .map_err(|_| GatewayError::internal(format!("Stored port out of range: {port}")))?,
            username: row.try_get("username").map_err(storage_error)?,
            password_hash: row.try_get("password_hash").map_err(storage_error)?,
            database_name: row.try_get("database_name").map_err(storage_error)?,
            dsn: row.try_get("dsn").map_err(storage_error)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(storage_error)?,
        })
    }

    fn endpoint_from_row(row: &SqliteRow) -> GatewayResult<EndpointRecord> {
        let websites: String = row.try_get("websites").map_err(storage_error)?;
        let response: String = row.try_get("response").map_err(storage_error)?;
        let project: Option<String> = row.try_get("source_project").map_err(storage_error)?;
        let table: Option<String> = row.try_get("source_table").map_err(storage_error)?;

        Ok(EndpointRecord {
            id: row.try_get("id").map_err(storage_error)?,
            base_url: row.try_get("base_url").map_err(storage_error)?,
            method: row.try_get("method").map_err(storage_error)?,
            path: row.try_get("path").map_err(storage_error)?,
            description: row.try_get("description").map_err(storage_error)?,
            status: row.try_get("status").map_err(storage_error)?,
            websites: decode_json::<Vec<String>>(&websites)?,
            response: decode_json::<JsonValue>(&response)?,
            table_source: project
                .zip(table)
                .map(|(project, table)| TableSource { project, table }),
        })
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn insert_project(&self, project: NewProject) -> GatewayResult<ProjectRecord> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO projects (uuid, project_name, engine, host, port, username, \
             password_hash, database_name, dsn, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project.uuid)
        .bind(&project.project_name)
        .bind(project.engine.scheme())
        .bind(&project.host)
        .bind(i64::from(project.port))
        .bind(&project.username)
        .bind(&project.password_hash)
        .bind(&project.database_name)
        .bind(&project.dsn)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(ProjectRecord {
            id: result.last_insert_rowid(),
            uuid: project.uuid,
            project_name: project.project_name,
            engine: project.engine,
            host: project.host,
            port: project.port,
            username: project.username,
            password_hash: project.password_hash,
            database_name: project.database_name,
            dsn: project.dsn,
            created_at,
        })
    }

    async fn list_projects(&self) -> GatewayResult<Vec<ProjectRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        rows.iter().map(Self::project_from_row).collect()
    }

    async fn get_project_by_uuid(&self, uuid: &str) -> GatewayResult<Option<ProjectRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.as_ref().map(Self::project_from_row).transpose()
    }

    async fn delete_project(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_endpoints(&self) -> GatewayResult<Vec<EndpointRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENDPOINT_COLUMNS} FROM endpoints ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        rows.iter().map(Self::endpoint_from_row).collect()
    }

    async fn get_endpoint(&self, id: i64) -> GatewayResult<Option<EndpointRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.as_ref().map(Self::endpoint_from_row).transpose()
    }

    async fn insert_endpoint(&self, endpoint: NewEndpoint) -> GatewayResult<EndpointRecord> {
        let websites = encode_json(&endpoint.websites)?;
        let response = encode_json(&endpoint.response)?;
        let (project, table) = match &endpoint.table_source {
            Some(source) => (Some(source.project.as_str()), Some(source.table.as_str())),
            None => (None, None),
        };

        let result = sqlx::query(
            "INSERT INTO endpoints (base_url, method, path, description, status, websites, \
             response, source_project, source_table) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&endpoint.base_url)
        .bind(&endpoint.method)
        .bind(&endpoint.path)
        .bind(&endpoint.description)
        .bind(&endpoint.status)
        .bind(websites)
        .bind(response)
        .bind(project)
        .bind(table)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(endpoint.into_record(result.last_insert_rowid()))
    }

    async fn update_endpoint(&self, id: i64, endpoint: NewEndpoint) -> GatewayResult<bool> {
        let websites = encode_json(&endpoint.websites)?;
        let response = encode_json(&endpoint.response)?;
        let (project, table) = match &endpoint.table_source {
            Some(source) => (Some(source.project.as_str()), Some(source.table.as_str())),
            None => (None, None),
        };

        let result = sqlx::query(
            "UPDATE endpoints SET base_url = ?, method = ?, path = ?, description = ?, \
             status = ?, websites = ?, response = ?, source_project = ?, source_table = ? \
             WHERE id = ?",
        )
        .bind(&endpoint.base_url)
        .bind(&endpoint.method)
        .bind(&endpoint.path)
        .bind(&endpoint.description)
        .bind(&endpoint.status)
        .bind(websites)
        .bind(response)
        .bind(project)
        .bind(table)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_endpoint(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM endpoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_domains(&self) -> GatewayResult<Vec<DomainRecord>> {
        let rows = sqlx::query("SELECT id, url FROM domains ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        rows.iter()
            .map(|row| {
                Ok(DomainRecord {
                    id: row.try_get("id").map_err(storage_error)?,
                    url: row.try_get("url").map_err(storage_error)?,
                })
            })
            .collect()
    }

    async fn insert_domain(&self, url: &str) -> GatewayResult<DomainRecord> {
        let result = sqlx::query("INSERT INTO domains (url) VALUES (?)")
            .bind(url)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(DomainRecord {
                id: done.last_insert_rowid(),
                url: url.to_string(),
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(GatewayError::invalid_input("Domain already exists"))
            }
            Err(e) => Err(storage_error(e)),
        }
    }
}
