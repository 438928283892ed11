//! Validation dispatchers
//!
//! [`Validate`] and [`ValidateAsync`] are action filters configured with an
//! ordered list of model types. For each request they:
//!
//! 1. pass through when the action carries [`SkipValidation`](crate::pipeline::SkipValidation);
//! 2. for every declared model type, find the first argument that is an
//!    instance of it, resolve its validator and validate it;
//! 3. turn failed outcomes into the pipeline result through the
//!    invalid-response strategy, following the configured [`FailurePolicy`];
//! 4. call the next stage, which does nothing once a result is set.
//!
//! Resolution errors abort the request. Failed validation never does.
//!
//! The caches both dispatchers rely on live in a [`ValidationRuntime`] built
//! once at startup and shared by every request.

pub mod cache;
pub mod validate;
pub mod validate_async;

pub use cache::{ResolutionCache, ResolutionEntry, SkipMarkerCache};
pub use validate::Validate;
pub use validate_async::ValidateAsync;

use crate::config::{FailurePolicy, ValidationConfig};
use crate::core::error::DispatchError;
use crate::core::model::{ModelType, RequestModel};
use crate::core::outcome::ValidationFailure;
use crate::core::response::{DefaultInvalidResponse, InvalidResponse, InvalidResponseService};
use crate::core::service::ServiceLocator;
use crate::pipeline::action::ActionDescriptor;
use std::sync::Arc;

/// Shared state of the validation dispatchers
///
/// Owns the service locator, the configuration and the two process-wide
/// caches. Build one per application; tests build one per case.
pub struct ValidationRuntime {
    services: Arc<dyn ServiceLocator>,
    resolutions: ResolutionCache,
    skip_markers: SkipMarkerCache,
    config: ValidationConfig,
}

impl ValidationRuntime {
    pub fn new(services: Arc<dyn ServiceLocator>) -> Self {
        Self {
            services,
            resolutions: ResolutionCache::new(),
            skip_markers: SkipMarkerCache::new(),
            config: ValidationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn services(&self) -> &dyn ServiceLocator {
        self.services.as_ref()
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn resolutions(&self) -> &ResolutionCache {
        &self.resolutions
    }

    pub fn skip_markers(&self) -> &SkipMarkerCache {
        &self.skip_markers
    }

    /// Resolve the validator of `model_type`
    pub fn resolve(&self, model_type: &ModelType) -> Result<ResolutionEntry, DispatchError> {
        self.resolutions.resolve(model_type, self.services())
    }

    /// Whether validation is disabled for `action`
    pub fn should_skip(&self, action: &ActionDescriptor) -> bool {
        self.skip_markers.has_skip_marker(action)
    }

    /// The registered invalid-response strategy, or the default one
    pub fn invalid_response(&self) -> Arc<dyn InvalidResponse> {
        InvalidResponseService::resolve(self.services()).unwrap_or_else(|| {
            Arc::new(DefaultInvalidResponse::new(self.config.invalid_status()))
        })
    }
}

/// What a dispatcher does with a failed model under a [`FailurePolicy`]
pub(crate) enum FailureAction {
    /// Answer with this model's failures now
    Respond { stop: bool },
    /// Keep the failures for a single combined answer
    Collect,
}

impl FailureAction {
    pub(crate) fn for_policy(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::LastFailureWins => FailureAction::Respond { stop: false },
            FailurePolicy::FirstFailureWins => FailureAction::Respond { stop: true },
            FailurePolicy::Aggregate => FailureAction::Collect,
        }
    }
}

/// Failures collected under [`FailurePolicy::Aggregate`]
///
/// The combined answer is attributed to the first failing model.
#[derive(Default)]
pub(crate) struct CollectedFailures {
    model: Option<Arc<dyn RequestModel>>,
    failures: Vec<ValidationFailure>,
}

impl CollectedFailures {
    pub(crate) fn push(&mut self, model: &Arc<dyn RequestModel>, failures: Vec<ValidationFailure>) {
        if self.model.is_none() {
            self.model = Some(model.clone());
        }
        self.failures.extend(failures);
    }

    pub(crate) fn finish(self) -> Option<(Arc<dyn RequestModel>, Vec<ValidationFailure>)> {
        self.model.map(|model| (model, self.failures))
    }
}
