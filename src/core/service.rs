//! Service lookup for validators and invalid-response strategies
//!
//! The dispatcher resolves everything it needs through a [`ServiceLocator`].
//! [`ServiceRegistry`] is the locator built once during composition; hosts that
//! already own a container can implement the trait themselves.

use super::error::DispatchError;
use super::outcome::{ValidationFailure, ValidationOutcome};
use super::response::{FnInvalidResponse, InvalidResponse, InvalidResponseService};
use super::validator::{FnValidator, ModelValidator, RuleValidator, ValidatorService};
use axum::response::Response;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use validator::Validate;

/// A resolved service
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Key identifying a service contract
///
/// Keys are derived from a contract type, e.g. `ValidatorService<CreateUser>`.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.name).finish()
    }
}

/// Lookup of services by key
pub trait ServiceLocator: Send + Sync {
    /// Get a service, or `None` if nothing is registered under `key`
    fn get_service(&self, key: &ServiceKey) -> Option<ServiceInstance>;

    /// Get a service that must exist
    fn get_required_service(&self, key: &ServiceKey) -> Result<ServiceInstance, DispatchError> {
        self.get_service(key)
            .ok_or(DispatchError::MissingService {
                service_key: key.name(),
            })
    }
}

/// Registry of services populated at startup
///
/// Registering a second service under the same key replaces the first one.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<ServiceKey, ServiceInstance>,
}

impl ServiceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a raw service under a key
    pub fn register(&mut self, key: ServiceKey, service: ServiceInstance) {
        tracing::debug!(service_key = key.name(), "registering service");
        self.services.insert(key, service);
    }

    /// Register the validator for the model type `M`
    pub fn add_validator<M>(&mut self, validator: impl ModelValidator<M> + 'static)
    where
        M: Send + Sync + 'static,
    {
        self.register(
            ServiceKey::of::<ValidatorService<M>>(),
            Arc::new(ValidatorService::new(validator)),
        );
    }

    /// Register a closure as the validator for the model type `M`
    pub fn add_validator_fn<M, F>(&mut self, f: F)
    where
        M: Send + Sync + 'static,
        F: Fn(&M) -> ValidationOutcome + Send + Sync + 'static,
    {
        self.add_validator::<M>(FnValidator::new(f));
    }

    /// Validate `M` with the rules it derives from `validator::Validate`
    pub fn add_rule_validator<M>(&mut self)
    where
        M: Validate + Send + Sync + 'static,
    {
        self.add_validator::<M>(RuleValidator::<M>::new());
    }

    /// Register a custom invalid-response strategy
    pub fn add_invalid_response(&mut self, strategy: impl InvalidResponse + 'static) {
        self.register(
            InvalidResponseService::key(),
            Arc::new(InvalidResponseService::new(strategy)),
        );
    }

    /// Register a closure building the response for a failure list
    pub fn add_invalid_response_fn<F>(&mut self, f: F)
    where
        F: Fn(&[ValidationFailure]) -> Response + Send + Sync + 'static,
    {
        self.add_invalid_response(FnInvalidResponse::new(f));
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.services.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLocator for ServiceRegistry {
    fn get_service(&self, key: &ServiceKey) -> Option<ServiceInstance> {
        self.services.get(key).cloned()
    }
}
