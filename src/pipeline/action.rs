//! Action metadata, arguments and the per-request context

use crate::core::model::{ModelType, RequestModel};
use crate::core::service::ServiceLocator;
use crate::dispatch::ValidationRuntime;
use axum::response::Response;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Stable identifier of an action
///
/// Generated once when the action is declared; every request to the action
/// shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A static, data-free property attached to an action
pub trait ActionMarker: Any + Send + Sync {}

/// Marker that disables every validation filter on the action it is attached to
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipValidation;

impl ActionMarker for SkipValidation {}

/// Metadata of a declared action
pub struct ActionDescriptor {
    id: ActionId,
    name: String,
    markers: Vec<Arc<dyn Any + Send + Sync>>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ActionId::new(),
            name: name.into(),
            markers: Vec::new(),
        }
    }

    /// Attach a marker to the action
    pub fn with_marker(mut self, marker: impl ActionMarker) -> Self {
        self.markers.push(Arc::new(marker));
        self
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a marker of type `T` is attached to the action
    pub fn has_marker<T: ActionMarker>(&self) -> bool {
        self.markers.iter().any(|marker| marker.is::<T>())
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("markers", &self.markers.len())
            .finish()
    }
}

/// Arguments bound for one action invocation, in binding order
#[derive(Clone, Default)]
pub struct ActionArguments {
    values: IndexMap<String, Arc<dyn RequestModel>>,
}

impl ActionArguments {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    /// Add an argument; an existing argument with the same name is replaced in place
    pub fn insert(&mut self, name: impl Into<String>, model: impl RequestModel) {
        self.values.insert(name.into(), Arc::new(model));
    }

    pub fn insert_arc(&mut self, name: impl Into<String>, model: Arc<dyn RequestModel>) {
        self.values.insert(name.into(), model);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, model: impl RequestModel) -> Self {
        self.insert(name, model);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn RequestModel>> {
        self.values.get(name)
    }

    /// Get an argument as its concrete type
    pub fn get_as<T: 'static>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref::<T>()
    }

    /// First argument that is an instance of `model_type`
    pub fn first_instance_of(&self, model_type: &ModelType) -> Option<Arc<dyn RequestModel>> {
        self.values
            .values()
            .find(|model| model.is_instance_of(model_type))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn RequestModel>)> {
        self.values.iter().map(|(name, model)| (name.as_str(), model))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ActionArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.values
                    .iter()
                    .map(|(name, model)| (name, model.model_name())),
            )
            .finish()
    }
}

/// State of one action invocation as it flows through the filters
///
/// Setting the result short-circuits every stage that has not run yet,
/// including the action body.
pub struct ActionContext {
    action: Arc<ActionDescriptor>,
    arguments: ActionArguments,
    result: Option<Response>,
    request_aborted: CancellationToken,
    runtime: Arc<ValidationRuntime>,
}

impl ActionContext {
    pub fn new(
        action: Arc<ActionDescriptor>,
        arguments: ActionArguments,
        request_aborted: CancellationToken,
        runtime: Arc<ValidationRuntime>,
    ) -> Self {
        Self {
            action,
            arguments,
            result: None,
            request_aborted,
            runtime,
        }
    }

    pub fn action(&self) -> &Arc<ActionDescriptor> {
        &self.action
    }

    pub fn arguments(&self) -> &ActionArguments {
        &self.arguments
    }

    pub fn result(&self) -> Option<&Response> {
        self.result.as_ref()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Set the result, replacing any earlier one
    pub fn set_result(&mut self, response: Response) {
        self.result = Some(response);
    }

    pub fn take_result(&mut self) -> Option<Response> {
        self.result.take()
    }

    /// Token cancelled when the client abandons the request
    pub fn request_aborted(&self) -> &CancellationToken {
        &self.request_aborted
    }

    pub fn runtime(&self) -> &Arc<ValidationRuntime> {
        &self.runtime
    }

    pub fn services(&self) -> &dyn ServiceLocator {
        self.runtime.services()
    }
}
