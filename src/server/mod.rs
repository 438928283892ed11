//! Server module exposing validated actions over HTTP
//!
//! This module provides a `ServerBuilder` that:
//! - collects validators and the invalid-response strategy into a registry
//! - mounts endpoints alone or in groups sharing a prefix and filters
//! - binds each endpoint's arguments from the request
//! - runs the endpoint's filter chain with a per-request abort token

pub mod binder;
pub mod builder;
pub mod endpoint;
pub mod group;
pub mod host;
pub mod router;

pub use binder::{BindingError, JsonBody, ModelBinder, QueryParams, RequestData};
pub use builder::ServerBuilder;
pub use endpoint::Endpoint;
pub use group::EndpointGroup;
pub use host::ValidationHost;
pub use router::{BoundEndpoint, RouteEntry};
