//! Axum adapter running bound endpoints

use super::binder::{BindingError, ModelBinder, RequestData};
use super::endpoint::Endpoint;
use crate::dispatch::ValidationRuntime;
use crate::pipeline::{ActionArguments, ActionPipeline};
use axum::Router;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use http_body_util::LengthLimitError;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An endpoint ready to serve requests
pub struct BoundEndpoint {
    pipeline: ActionPipeline,
    binders: Vec<Arc<dyn ModelBinder>>,
    runtime: Arc<ValidationRuntime>,
}

impl BoundEndpoint {
    pub fn new(endpoint: Endpoint, runtime: Arc<ValidationRuntime>) -> Self {
        let (pipeline, binders) = endpoint.into_parts();
        Self {
            pipeline,
            binders,
            runtime,
        }
    }

    pub fn pipeline(&self) -> &ActionPipeline {
        &self.pipeline
    }

    /// Bind the request, run the pipeline and render its outcome
    ///
    /// The abort token handed to the pipeline is cancelled if this future is
    /// dropped before it completes, which is what happens when the client
    /// goes away.
    pub async fn handle(&self, request: Request) -> Response {
        let action = self.pipeline.descriptor().name();
        let (parts, body) = request.into_parts();

        let limit = self.runtime.config().max_body_bytes;
        let body = match axum::body::to_bytes(body, limit).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(action, error = %e, "request body rejected");
                return body_error(e, limit).into_response();
            }
        };

        let data = RequestData {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        };

        let arguments = match self.bind(&data) {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::debug!(action, error = %e, "model binding failed");
                return e.into_response();
            }
        };

        let request_aborted = CancellationToken::new();
        let abort_on_drop = request_aborted.clone().drop_guard();

        let result = self
            .pipeline
            .execute(arguments, request_aborted, self.runtime.clone())
            .await;
        abort_on_drop.disarm();

        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(action, error = %e, code = e.error_code(), "request dispatch failed");
                e.into_response()
            }
        }
    }

    fn bind(&self, data: &RequestData) -> Result<ActionArguments, BindingError> {
        let mut arguments = ActionArguments::new();
        for binder in &self.binders {
            arguments.insert_arc(binder.argument(), binder.bind(data)?);
        }
        Ok(arguments)
    }
}

/// Only a body over the limit is a 413; a body stream that fails is a 400
fn body_error(error: axum::Error, limit: usize) -> BindingError {
    let over_limit = std::error::Error::source(&error)
        .is_some_and(|source| source.is::<LengthLimitError>());

    if over_limit {
        BindingError::PayloadTooLarge { limit }
    } else {
        BindingError::UnreadableBody {
            message: error.to_string(),
        }
    }
}

/// A bound endpoint mounted on a method and path
pub struct RouteEntry {
    pub method: MethodFilter,
    pub path: String,
    pub endpoint: Arc<BoundEndpoint>,
}

/// Build the axum router serving `routes`
///
/// Endpoints sharing a path are merged into a single method router.
pub fn build_endpoint_routes(routes: &[RouteEntry]) -> Router {
    let mut by_path: IndexMap<&str, MethodRouter> = IndexMap::new();

    for route in routes {
        let endpoint = route.endpoint.clone();
        let handler = move |request: Request| {
            let endpoint = endpoint.clone();
            async move { endpoint.handle(request).await }
        };

        let method_router = by_path
            .shift_remove(route.path.as_str())
            .unwrap_or_else(MethodRouter::new)
            .on(route.method, handler);
        by_path.insert(route.path.as_str(), method_router);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
}
