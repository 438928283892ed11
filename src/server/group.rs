//! Endpoints sharing a path prefix and a set of filters

use super::endpoint::Endpoint;
use crate::core::model::ModelType;
use crate::dispatch::{Validate, ValidateAsync};
use crate::pipeline::ActionFilter;
use axum::routing::MethodFilter;
use std::sync::Arc;

/// A group of endpoints mounted under one prefix
///
/// Filters added to the group run on every endpoint of the group, ahead of
/// the endpoint's own filters of the same order. An endpoint opts out of a
/// group-wide validation with [`Endpoint::skip_validation`].
///
/// # Example
///
/// ```rust,ignore
/// let samples = EndpointGroup::new("/api/samples")
///     .validate([ModelType::of::<CreateSample>()])
///     .post("", create_endpoint)
///     .post("/import", import_endpoint.skip_validation());
///
/// let app = ServerBuilder::new().group(samples).build()?;
/// ```
pub struct EndpointGroup {
    prefix: String,
    filters: Vec<Arc<dyn ActionFilter>>,
    routes: Vec<(MethodFilter, String, Endpoint)>,
}

impl EndpointGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            filters: Vec::new(),
            routes: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: impl ActionFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Validate the given model types on every endpoint of the group
    pub fn validate(self, model_types: impl IntoIterator<Item = ModelType>) -> Self {
        self.filter(Validate::new(model_types))
    }

    /// Validate the given model types asynchronously on every endpoint of the group
    pub fn validate_async(self, model_types: impl IntoIterator<Item = ModelType>) -> Self {
        self.filter(ValidateAsync::new(model_types))
    }

    /// Mount an endpoint on a method and a path relative to the prefix
    pub fn route(mut self, method: MethodFilter, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.routes.push((method, path.into(), endpoint));
        self
    }

    pub fn get(self, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.route(MethodFilter::GET, path, endpoint)
    }

    pub fn post(self, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.route(MethodFilter::POST, path, endpoint)
    }

    pub fn put(self, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.route(MethodFilter::PUT, path, endpoint)
    }

    pub fn patch(self, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.route(MethodFilter::PATCH, path, endpoint)
    }

    pub fn delete(self, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.route(MethodFilter::DELETE, path, endpoint)
    }

    /// The group's routes with full paths and the group filters attached
    pub(crate) fn into_routes(self) -> Vec<(MethodFilter, String, Endpoint)> {
        let Self {
            prefix,
            filters,
            routes,
        } = self;

        routes
            .into_iter()
            .map(|(method, path, endpoint)| {
                (
                    method,
                    join_path(&prefix, &path),
                    endpoint.with_outer_filters(&filters),
                )
            })
            .collect()
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match path {
        "" | "/" if !prefix.is_empty() => prefix.to_string(),
        _ if path.starts_with('/') => format!("{prefix}{path}"),
        _ => format!("{prefix}/{path}"),
    }
}
