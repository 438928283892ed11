//! Server host holding the validation runtime and the bound endpoints
//!
//! The host is built once by [`ServerBuilder`](super::ServerBuilder) and is the
//! single owner of the state every request shares.

use super::router::{BoundEndpoint, RouteEntry, build_endpoint_routes};
use crate::dispatch::ValidationRuntime;
use axum::Router;
use axum::routing::MethodFilter;
use std::sync::Arc;

/// Host context containing all framework state
pub struct ValidationHost {
    /// Runtime shared by every endpoint
    pub runtime: Arc<ValidationRuntime>,

    routes: Vec<RouteEntry>,
}

impl ValidationHost {
    pub fn new(runtime: Arc<ValidationRuntime>) -> Self {
        Self {
            runtime,
            routes: Vec::new(),
        }
    }

    pub(crate) fn push_route(&mut self, method: MethodFilter, path: String, endpoint: BoundEndpoint) {
        self.routes.push(RouteEntry {
            method,
            path,
            endpoint: Arc::new(endpoint),
        });
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Find the endpoint declared under `name`
    pub fn endpoint(&self, name: &str) -> Option<&Arc<BoundEndpoint>> {
        self.routes
            .iter()
            .map(|route| &route.endpoint)
            .find(|endpoint| endpoint.pipeline().descriptor().name() == name)
    }

    /// Axum router serving every route of the host
    pub fn router(&self) -> Router {
        build_endpoint_routes(&self.routes)
    }
}
