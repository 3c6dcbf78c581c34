//! Endpoint generation from a project table.

use crate::catalog::CatalogStore;
use crate::db::connection::{ConnectionTarget, with_connection};
use crate::db::executor;
use crate::db::schema::{SchemaInspector, contains_table};
use crate::db::validate_table_name;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{DEFAULT_ENDPOINT_STATUS, EndpointRecord, NewEndpoint, TableSource};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub table_name: String,
}

/// Base URL under which generated endpoints of a project are served.
pub fn project_base_url(uuid: &str) -> String {
    format!("/restapi/{uuid}")
}

pub struct EndpointGenerator {
    catalog: Arc<dyn CatalogStore>,
}

impl EndpointGenerator {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Create an endpoint record backed by `table` of the given project.
    ///
    /// One sample row becomes the response snapshot (`{}` for an empty
    /// table). Repeated calls create repeated records.
    pub async fn generate_from_table(
        &self,
        project_uuid: &str,
        table: &str,
    ) -> GatewayResult<EndpointRecord> {
        let table = table.trim();
        if table.is_empty() {
            return Err(GatewayError::missing_fields(["tableName"]));
        }
        validate_table_name(table)?;

        let project = self
            .catalog
            .get_project_by_uuid(project_uuid)
            .await?
            .ok_or_else(|| GatewayError::not_found("Project", project_uuid))?;

        let target = ConnectionTarget::Dsn(project.dsn.clone());
        let owned_table = table.to_string();
        let sample = with_connection(&target, move |conn| {
            Box::pin(async move {
                let tables = SchemaInspector::list_tables(conn).await?;
                if !contains_table(&tables, &owned_table) {
                    return Err(GatewayError::table_not_found(owned_table));
                }
                executor::sample_row(conn, &owned_table).await
            })
        })
        .await?;

        let response = sample
            .map(JsonValue::Object)
            .unwrap_or_else(|| JsonValue::Object(Default::default()));

        let record = self
            .catalog
            .insert_endpoint(NewEndpoint {
                base_url: project_base_url(&project.uuid),
                method: "GET".to_string(),
                path: format!("/{table}"),
                description: format!("Rows of {table} from {}", project.project_name),
                status: DEFAULT_ENDPOINT_STATUS.to_string(),
                websites: Vec::new(),
                response,
                table_source: Some(TableSource {
                    project: project.uuid.clone(),
                    table: table.to_string(),
                }),
            })
            .await?;

        info!(
            id = record.id,
            uuid = %project.uuid,
            table = table,
            "Generated endpoint from table"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::error::ErrorKind;

    #[test]
    fn test_project_base_url() {
        assert_eq!(project_base_url("abc"), "/restapi/abc");
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_table_without_lookup() {
        let generator = EndpointGenerator::new(Arc::new(MemoryCatalog::new()));
        // Unknown project, but validation comes first.
        let err = generator
            .generate_from_table("missing", "orders`; --")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidTableName { .. }));
    }

    #[tokio::test]
    async fn test_generate_requires_table_name() {
        let generator = EndpointGenerator::new(Arc::new(MemoryCatalog::new()));
        let err = generator.generate_from_table("missing", " ").await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingFields { .. }));
    }

    #[tokio::test]
    async fn test_generate_unknown_project() {
        let catalog = Arc::new(MemoryCatalog::new());
        let generator = EndpointGenerator::new(catalog.clone());
        let err = generator
            .generate_from_table("missing", "orders")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(catalog.list_endpoints().await.unwrap().is_empty());
    }
}
