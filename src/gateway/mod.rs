//! Gateway services: project registry, endpoint generation and dispatch.

pub mod generator;
pub mod projects;
pub mod proxy;

pub use generator::{EndpointGenerator, GenerateRequest};
pub use projects::{DescribeRequest, InspectOptions, ProjectService};
pub use proxy::ProxyDispatcher;
