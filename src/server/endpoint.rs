//! Declaration of an HTTP action: binders, filters, markers and body

use super::binder::ModelBinder;
use crate::core::model::ModelType;
use crate::dispatch::{Validate, ValidateAsync};
use crate::pipeline::{
    ActionDescriptor, ActionFilter, ActionHandler, ActionMarker, ActionPipeline, SkipValidation,
};
use std::sync::Arc;

/// An action exposed on a route
///
/// # Example
///
/// ```rust,ignore
/// let create = Endpoint::new("samples.create", create_sample)
///     .bind(JsonBody::<CreateSample>::new("request"))
///     .validate([ModelType::of::<CreateSample>()]);
/// ```
pub struct Endpoint {
    descriptor: ActionDescriptor,
    binders: Vec<Arc<dyn ModelBinder>>,
    filters: Vec<Arc<dyn ActionFilter>>,
    handler: Arc<dyn ActionHandler>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        Self {
            descriptor: ActionDescriptor::new(name),
            binders: Vec::new(),
            filters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Add an argument binder; arguments are bound in declaration order
    pub fn bind(mut self, binder: impl ModelBinder + 'static) -> Self {
        self.binders.push(Arc::new(binder));
        self
    }

    pub fn filter(mut self, filter: impl ActionFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Validate the given model types with the synchronous dispatcher
    pub fn validate(self, model_types: impl IntoIterator<Item = ModelType>) -> Self {
        self.filter(Validate::new(model_types))
    }

    /// Validate the given model types with the asynchronous dispatcher
    pub fn validate_async(self, model_types: impl IntoIterator<Item = ModelType>) -> Self {
        self.filter(ValidateAsync::new(model_types))
    }

    /// Disable every validation filter on this endpoint
    pub fn skip_validation(self) -> Self {
        self.marker(SkipValidation)
    }

    pub fn marker(mut self, marker: impl ActionMarker) -> Self {
        self.descriptor = self.descriptor.with_marker(marker);
        self
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn binders(&self) -> &[Arc<dyn ModelBinder>] {
        &self.binders
    }

    /// Put `filters` ahead of this endpoint's own filters
    pub(crate) fn with_outer_filters(mut self, filters: &[Arc<dyn ActionFilter>]) -> Self {
        let own = std::mem::take(&mut self.filters);
        self.filters = filters.iter().cloned().chain(own).collect();
        self
    }

    pub(crate) fn into_parts(self) -> (ActionPipeline, Vec<Arc<dyn ModelBinder>>) {
        let mut pipeline = ActionPipeline::from_arc(self.descriptor, self.handler);
        for filter in self.filters {
            pipeline.push_filter(filter);
        }
        (pipeline, self.binders)
    }
}
