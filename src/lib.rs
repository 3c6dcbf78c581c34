//! DB API Gateway Library
//!
//! A metadata-driven API gateway: register external MySQL/PostgreSQL
//! databases and static HTTP endpoints, introspect schemas over transient
//! connections, and serve generated routes.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod transport;

pub use catalog::CatalogStore;
pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use transport::AppState;
