//! HTTP transport for the API gateway.
//!
//! - `routes`: axum router and request handlers
//! - `http`: listener, serving and graceful shutdown

pub mod http;
pub mod routes;

pub use http::HttpTransport;
pub use routes::create_router;

use crate::catalog::CatalogStore;
use crate::gateway::{EndpointGenerator, ProjectService, ProxyDispatcher};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub projects: Arc<ProjectService>,
    pub generator: Arc<EndpointGenerator>,
    pub proxy: Arc<ProxyDispatcher>,
}

impl AppState {
    /// Build the services around a catalog and an outbound HTTP client.
    pub fn new(catalog: Arc<dyn CatalogStore>, client: reqwest::Client) -> Self {
        Self {
            projects: Arc::new(ProjectService::new(catalog.clone())),
            generator: Arc::new(EndpointGenerator::new(catalog.clone())),
            proxy: Arc::new(ProxyDispatcher::new(catalog.clone(), client)),
            catalog,
        }
    }
}
