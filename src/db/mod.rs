//! Target database access.
//!
//! - DSN encoding and decoding
//! - Engine catalog with introspection statements
//! - Transient, per-request connections
//! - Schema introspection and table reads
//! - Row-to-JSON type mappings

pub mod connection;
pub mod dsn;
pub mod engines;
pub mod executor;
pub mod schema;
pub mod types;

pub use connection::{ConnectionTarget, TargetConnection, with_connection};
pub use engines::{EngineProfile, validate_table_name};
pub use executor::JsonRow;
pub use schema::SchemaInspector;
