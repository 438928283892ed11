//! ServerBuilder for fluent API to build HTTP servers

use super::endpoint::Endpoint;
use super::group::EndpointGroup;
use super::host::ValidationHost;
use super::router::BoundEndpoint;
use crate::config::ValidationConfig;
use crate::core::outcome::{ValidationFailure, ValidationOutcome};
use crate::core::response::InvalidResponse;
use crate::core::service::{ServiceLocator, ServiceRegistry};
use crate::core::validator::ModelValidator;
use crate::dispatch::ValidationRuntime;
use anyhow::Result;
use axum::Router;
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use validator::Validate;

/// Builder for creating HTTP servers whose endpoints validate their models
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_rule_validator::<CreateSample>()
///     .post(
///         "/api/samples",
///         Endpoint::new("samples.create", create_sample)
///             .bind(JsonBody::<CreateSample>::new("request"))
///             .validate([ModelType::of::<CreateSample>()]),
///     )
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ValidationConfig,
    registry: ServiceRegistry,
    services: Option<Arc<dyn ServiceLocator>>,
    routes: Vec<(MethodFilter, String, Endpoint)>,
    custom_routes: Vec<(String, MethodRouter)>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: ValidationConfig::default(),
            registry: ServiceRegistry::new(),
            services: None,
            routes: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an external service locator instead of the builder's registry
    ///
    /// Validators and strategies must then be registered on that locator;
    /// mixing both is rejected by [`build_host`](Self::build_host).
    pub fn with_services(mut self, services: impl ServiceLocator + 'static) -> Self {
        self.services = Some(Arc::new(services));
        self
    }

    /// Register the validator of the model type `M`
    pub fn with_validator<M>(mut self, validator: impl ModelValidator<M> + 'static) -> Self
    where
        M: Send + Sync + 'static,
    {
        self.registry.add_validator::<M>(validator);
        self
    }

    /// Register a closure as the validator of the model type `M`
    pub fn with_validator_fn<M, F>(mut self, f: F) -> Self
    where
        M: Send + Sync + 'static,
        F: Fn(&M) -> ValidationOutcome + Send + Sync + 'static,
    {
        self.registry.add_validator_fn(f);
        self
    }

    /// Validate `M` with its `validator::Validate` rules
    pub fn with_rule_validator<M>(mut self) -> Self
    where
        M: Validate + Send + Sync + 'static,
    {
        self.registry.add_rule_validator::<M>();
        self
    }

    /// Replace the default invalid response
    pub fn with_invalid_response(mut self, strategy: impl InvalidResponse + 'static) -> Self {
        self.registry.add_invalid_response(strategy);
        self
    }

    /// Replace the default invalid response with a closure over the failures
    pub fn with_invalid_response_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&[ValidationFailure]) -> Response + Send + Sync + 'static,
    {
        self.registry.add_invalid_response_fn(f);
        self
    }

    /// Serve a plain axum route next to the endpoints
    ///
    /// The path is reserved for the custom route: no endpoint may share it.
    pub fn with_custom_route(mut self, path: impl Into<String>, route: MethodRouter) -> Self {
        self.custom_routes.push((path.into(), route));
        self
    }

    /// Mount an endpoint on a method and path
    pub fn route(mut self, method: MethodFilter, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.routes.push((method, path.into(), endpoint));
        self
    }

    /// Mount every endpoint of a group
    pub fn group(mut self, group: EndpointGroup) -> Self {
        self.routes.extend(group.into_routes());
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

    /// Build the host holding the runtime and the bound endpoints
    pub fn build_host(self) -> Result<ValidationHost> {
        self.into_parts().map(|(host, _)| host)
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let trace_requests = self.config.trace_requests;

        let (host, custom_routes) = self.into_parts()?;
        let mut router = custom_routes
            .into_iter()
            .fold(host.router(), |router, (path, route)| router.route(&path, route));

        if trace_requests {
            router = router.layer(TraceLayer::new_for_http());
        }

        Ok(router)
    }

    fn into_parts(self) -> Result<(ValidationHost, Vec<(String, MethodRouter)>)> {
        self.config.check()?;

        if self.services.is_some() && !self.registry.is_empty() {
            anyhow::bail!(
                "services registered on the builder would be ignored by the external service locator"
            );
        }

        let mut mounted = MountedPaths::default();
        for (method, path, endpoint) in &self.routes {
            mounted.mount(*method, path, endpoint.name())?;
        }
        for (path, _) in &self.custom_routes {
            mounted.mount(ANY_METHOD, path, "custom route")?;
        }

        let services: Arc<dyn ServiceLocator> = match self.services {
            Some(services) => services,
            None => Arc::new(self.registry),
        };

        let runtime = Arc::new(ValidationRuntime::new(services).with_config(self.config));
        let mut host = ValidationHost::new(runtime.clone());

        for (method, path, endpoint) in self.routes {
            tracing::debug!(endpoint = endpoint.name(), path = %path, "mounting endpoint");
            host.push_route(method, path, BoundEndpoint::new(endpoint, runtime.clone()));
        }

        Ok((host, self.custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

const METHODS: [(MethodFilter, &str); 9] = [
    (MethodFilter::CONNECT, "CONNECT"),
    (MethodFilter::DELETE, "DELETE"),
    (MethodFilter::GET, "GET"),
    (MethodFilter::HEAD, "HEAD"),
    (MethodFilter::OPTIONS, "OPTIONS"),
    (MethodFilter::PATCH, "PATCH"),
    (MethodFilter::POST, "POST"),
    (MethodFilter::PUT, "PUT"),
    (MethodFilter::TRACE, "TRACE"),
];

const ANY_METHOD: MethodFilter = MethodFilter::CONNECT
    .or(MethodFilter::DELETE)
    .or(MethodFilter::GET)
    .or(MethodFilter::HEAD)
    .or(MethodFilter::OPTIONS)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::POST)
    .or(MethodFilter::PUT)
    .or(MethodFilter::TRACE);

fn method_names(filter: MethodFilter) -> impl Iterator<Item = &'static str> {
    METHODS
        .into_iter()
        .filter(move |(method, _)| filter.or(*method) == filter)
        .map(|(_, name)| name)
}

/// Two paths have the same shape when they only differ in parameter names
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Methods claimed on every mounted path, checked before the router is built
#[derive(Default)]
struct MountedPaths {
    by_shape: HashMap<String, (String, Vec<&'static str>)>,
}

impl MountedPaths {
    fn mount(&mut self, method: MethodFilter, path: &str, owner: &str) -> Result<()> {
        if !path.starts_with('/') {
            anyhow::bail!("'{}' is mounted on '{}', paths must start with '/'", owner, path);
        }

        let methods: Vec<&'static str> = method_names(method).collect();
        match self.by_shape.get_mut(&path_shape(path)) {
            None => {
                self.by_shape
                    .insert(path_shape(path), (path.to_string(), methods));
            }
            Some((mounted, taken)) => {
                if mounted.as_str() != path {
                    anyhow::bail!(
                        "'{}' on '{}' conflicts with the parameters of '{}'",
                        owner,
                        path,
                        mounted
                    );
                }
                if let Some(method) = methods.iter().find(|method| taken.contains(*method)) {
                    anyhow::bail!(
                        "'{}' overlaps an earlier {} route on '{}'",
                        owner,
                        method,
                        path
                    );
                }
                taken.extend(methods);
            }
        }

        Ok(())
    }
}
