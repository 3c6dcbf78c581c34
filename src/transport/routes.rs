//! Router and request handlers.
//!
//! Success bodies are either the raw result or `{ message, ... }`; errors
//! are rendered by [`GatewayError`]'s `IntoResponse` as `{ error, detail? }`.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::projects::{ProjectTables, RegisteredProject, TableList, TableStructure};
use crate::gateway::{DescribeRequest, GenerateRequest, InspectOptions};
use crate::models::{
    DescriptorInput, DomainRecord, EndpointPayload, EndpointRecord, EndpointSource,
    ProjectRecord, ProjectRegistration, TableSource,
};
use crate::transport::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the gateway router. API routes live under `prefix` (e.g. "/api").
pub fn create_router(state: AppState, prefix: &str) -> Router {
    let api = Router::new()
        // Endpoints
        .route("/get", get(list_endpoints))
        .route("/post", post(add_endpoint))
        .route("/put/{id}", put(update_endpoint))
        .route("/delete/{id}", delete(delete_endpoint))
        // Domains
        .route("/domain/get", get(list_domains))
        .route("/domain/post", post(add_domain))
        // REST API projects
        .route("/restapi/get", get(list_projects))
        .route("/restapi/post", post(register_project))
        .route("/restapi/delete/{id}", delete(delete_project))
        .route("/restapi/{uuid}", get(inspect_project))
        .route("/restapi/{uuid}/generate", post(generate_endpoint))
        .route("/restapi/{uuid}/table/{table}", get(read_project_table))
        .route("/restapi/{uuid}/{table}", get(read_project_table))
        // Database tools
        .route("/testconn", post(test_connection))
        .route("/describe", post(describe_table))
        // Public dispatch
        .route("/call/{id}", get(call_endpoint_root))
        .route("/call/{id}/{*path}", get(call_endpoint));

    let prefix = prefix.trim_end_matches('/');
    let router = Router::new().route("/", get(|| async { "API gateway is running" }));
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Extractor helpers
// =============================================================================

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> GatewayResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| GatewayError::invalid_input(rejection.body_text()))
}

fn path_param<T>(path: Result<Path<T>, PathRejection>) -> GatewayResult<T> {
    path.map(|Path(value)| value)
        .map_err(|rejection| GatewayError::invalid_input(rejection.body_text()))
}

fn message(text: &str) -> Json<JsonValue> {
    Json(json!({ "message": text }))
}

// =============================================================================
// Endpoints
// =============================================================================

async fn list_endpoints(State(state): State<AppState>) -> GatewayResult<Json<Vec<EndpointRecord>>> {
    Ok(Json(state.catalog.list_endpoints().await?))
}

async fn add_endpoint(
    State(state): State<AppState>,
    body: Result<Json<EndpointPayload>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<JsonValue>)> {
    let endpoint = json_body(body)?.validate()?;
    let record = state.catalog.insert_endpoint(endpoint).await?;
    info!(id = record.id, path = %record.path, "Added endpoint");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Endpoint created", "id": record.id })),
    ))
}

async fn update_endpoint(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<EndpointPayload>, JsonRejection>,
) -> GatewayResult<Json<JsonValue>> {
    let id = path_param(id)?;
    let mut endpoint = json_body(body)?.validate()?;
    let existing = state
        .catalog
        .get_endpoint(id)
        .await?
        .ok_or_else(|| GatewayError::not_found("Endpoint", id.to_string()))?;
    // Table backing is set by generation only; edits keep it.
    endpoint.table_source = existing.table_source;
    if !state.catalog.update_endpoint(id, endpoint).await? {
        return Err(GatewayError::not_found("Endpoint", id.to_string()));
    }
    info!(id = id, "Updated endpoint");
    Ok(message("Endpoint updated"))
}

async fn delete_endpoint(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> GatewayResult<Json<JsonValue>> {
    let id = path_param(id)?;
    if !state.catalog.delete_endpoint(id).await? {
        return Err(GatewayError::not_found("Endpoint", id.to_string()));
    }
    info!(id = id, "Deleted endpoint");
    Ok(message("Endpoint deleted"))
}

// =============================================================================
// Domains
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct DomainInput {
    #[serde(default)]
    url: String,
}

async fn list_domains(State(state): State<AppState>) -> GatewayResult<Json<Vec<DomainRecord>>> {
    Ok(Json(state.catalog.list_domains().await?))
}

async fn add_domain(
    State(state): State<AppState>,
    body: Result<Json<DomainInput>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<JsonValue>)> {
    let input = json_body(body)?;
    let url = input.url.trim();
    if url.is_empty() {
        return Err(GatewayError::missing_fields(["url"]));
    }
    let domain = state.catalog.insert_domain(url).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Domain created", "url": domain.url })),
    ))
}

// =============================================================================
// REST API projects
// =============================================================================

async fn list_projects(State(state): State<AppState>) -> GatewayResult<Json<Vec<ProjectRecord>>> {
    Ok(Json(state.projects.list().await?))
}

async fn register_project(
    State(state): State<AppState>,
    body: Result<Json<ProjectRegistration>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<RegisteredProject>)> {
    let created = state.projects.register(json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_project(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> GatewayResult<Json<JsonValue>> {
    state.projects.delete(path_param(id)?).await?;
    Ok(message("REST API project deleted"))
}

async fn inspect_project(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    options: Result<Query<InspectOptions>, QueryRejection>,
) -> GatewayResult<Json<ProjectTables>> {
    let Query(options) =
        options.map_err(|rejection| GatewayError::invalid_input(rejection.body_text()))?;
    Ok(Json(state.projects.inspect(&uuid, options).await?))
}

async fn generate_endpoint(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<JsonValue>)> {
    let request = json_body(body)?;
    let endpoint = state
        .generator
        .generate_from_table(&uuid, &request.table_name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Endpoint generated", "endpoint": endpoint })),
    ))
}

async fn read_project_table(
    State(state): State<AppState>,
    Path((project, table)): Path<(String, String)>,
) -> GatewayResult<Json<JsonValue>> {
    let source = EndpointSource::DynamicTable(TableSource { project, table });
    Ok(Json(state.proxy.dispatch(&source, "").await?))
}

// =============================================================================
// Database tools
// =============================================================================

async fn test_connection(
    State(state): State<AppState>,
    body: Result<Json<DescriptorInput>, JsonRejection>,
) -> GatewayResult<Json<TableList>> {
    Ok(Json(state.projects.test_connection(json_body(body)?).await?))
}

async fn describe_table(
    State(state): State<AppState>,
    body: Result<Json<DescribeRequest>, JsonRejection>,
) -> GatewayResult<Json<TableStructure>> {
    Ok(Json(state.projects.describe(json_body(body)?).await?))
}

// =============================================================================
// Public dispatch
// =============================================================================

async fn call_endpoint_root(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> GatewayResult<Json<JsonValue>> {
    let id = path_param(id)?;
    Ok(Json(state.proxy.dispatch_endpoint(id, "").await?))
}

async fn call_endpoint(
    State(state): State<AppState>,
    params: Result<Path<(i64, String)>, PathRejection>,
) -> GatewayResult<Json<JsonValue>> {
    let (id, sub_path) = path_param(params)?;
    Ok(Json(state.proxy.dispatch_endpoint(id, &sub_path).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(Arc::new(MemoryCatalog::new()), reqwest::Client::new());
        create_router(state, "/api")
    }

    #[tokio::test]
    async fn test_root_is_alive() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("running"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = app()
            .oneshot(
                Request::post("/api/post")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_bad_request() {
        let response = app()
            .oneshot(Request::delete("/api/delete/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let state = AppState::new(Arc::new(MemoryCatalog::new()), reqwest::Client::new());
        let app = create_router(state, "/v2/");
        let response = app
            .oneshot(Request::get("/v2/get").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
