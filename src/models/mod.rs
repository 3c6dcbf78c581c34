//! Data models for the API gateway.
//!
//! This module contains all the data structures used throughout the application:
//! - Connection targets and registration input
//! - Introspected schema shapes
//! - Catalog records (projects, endpoints, domains)

pub mod catalog;
pub mod connection;
pub mod schema;

pub use catalog::{
    DEFAULT_ENDPOINT_STATUS, DomainRecord, EndpointPayload, EndpointRecord, EndpointSource,
    NewEndpoint, NewProject, ProjectRecord, TableSource,
};
pub use connection::{
    ConnectionDescriptor, DescriptorInput, EngineKind, PortValue, ProjectRegistration,
};
pub use schema::{ColumnDescriptor, KeyRole, TableDescriptor};
