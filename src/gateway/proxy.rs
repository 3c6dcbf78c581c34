//! Request dispatch for synthesized routes.
//!
//! An endpoint is served according to its [`EndpointSource`]: static
//! endpoints forward a GET to the stored base URL, table-backed endpoints
//! read rows from the project's database over a transient connection.

use crate::catalog::CatalogStore;
use crate::db::connection::{ConnectionTarget, with_connection};
use crate::db::executor;
use crate::db::validate_table_name;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{EndpointSource, TableSource};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Join a base URL and a sub-path with exactly one `/` between them.
pub fn join_url(base_url: &str, sub_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        sub_path.trim_start_matches('/')
    )
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

pub struct ProxyDispatcher {
    catalog: Arc<dyn CatalogStore>,
    client: reqwest::Client,
}

impl ProxyDispatcher {
    pub fn new(catalog: Arc<dyn CatalogStore>, client: reqwest::Client) -> Self {
        Self { catalog, client }
    }

    /// Look up endpoint `id` and dispatch on its source.
    pub async fn dispatch_endpoint(&self, id: i64, sub_path: &str) -> GatewayResult<JsonValue> {
        let endpoint = self
            .catalog
            .get_endpoint(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("Endpoint", id.to_string()))?;
        debug!(id = id, path = %endpoint.path, "Dispatching endpoint");
        self.dispatch(&endpoint.source(), sub_path).await
    }

    pub async fn dispatch(&self, source: &EndpointSource, sub_path: &str) -> GatewayResult<JsonValue> {
        match source {
            EndpointSource::StaticHttp { base_url } => {
                self.forward(&join_url(base_url, sub_path)).await
            }
            EndpointSource::DynamicTable(table) => self.read_table(table).await,
        }
    }

    /// Outbound GET. There is no timeout on the request.
    async fn forward(&self, url: &str) -> GatewayResult<JsonValue> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "External URL unreachable");
                GatewayError::upstream_unavailable(url, e.to_string())
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::upstream_unavailable(url, e.to_string()))?;

        info!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Forwarded request"
        );

        if !status.is_success() {
            return Err(GatewayError::upstream_rejected(url, status.as_u16(), body));
        }

        if is_json_content_type(&content_type) {
            serde_json::from_str(&body).map_err(|e| {
                GatewayError::upstream_rejected(
                    url,
                    status.as_u16(),
                    format!("invalid JSON body: {e}"),
                )
            })
        } else {
            Ok(json!({
                "warning": "Response is not JSON",
                "contentType": content_type,
                "raw": body,
            }))
        }
    }

    async fn read_table(&self, source: &TableSource) -> GatewayResult<JsonValue> {
        validate_table_name(&source.table)?;

        let project = self
            .catalog
            .get_project_by_uuid(&source.project)
            .await?
            .ok_or_else(|| GatewayError::not_found("Project", source.project.as_str()))?;

        let target = ConnectionTarget::Dsn(project.dsn);
        let table = source.table.clone();
        let rows = with_connection(&target, move |conn| {
            Box::pin(async move { executor::read_table(conn, &table, None).await })
        })
        .await?;

        Ok(JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_single_separator() {
        assert_eq!(join_url("https://a.io/", "/users"), "https://a.io/users");
        assert_eq!(join_url("https://a.io", "users"), "https://a.io/users");
        assert_eq!(join_url("https://a.io//", "//users/1"), "https://a.io/users/1");
        assert_eq!(join_url("https://a.io", ""), "https://a.io/");
    }

    #[test]
    fn test_is_json_content_type() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type(""));
    }
}
