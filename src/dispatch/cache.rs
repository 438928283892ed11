//! Process-wide caches shared by every request
//!
//! Both caches are filled on the first request that needs an entry and are
//! never evicted. Entries are deterministic for their key, so two requests
//! racing on a new key may both compute it; the last write wins and both
//! writes are equivalent.

use crate::core::error::DispatchError;
use crate::core::model::{ModelType, RequestModel};
use crate::core::outcome::ValidationOutcome;
use crate::core::service::{ServiceInstance, ServiceKey, ServiceLocator};
use crate::core::validator::ValidateOperation;
use crate::pipeline::action::{ActionDescriptor, ActionId, SkipValidation};
use dashmap::DashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// A resolved validator for one model type
#[derive(Clone)]
pub struct ResolutionEntry {
    key: ServiceKey,
    operation: ValidateOperation,
    service: ServiceInstance,
}

impl ResolutionEntry {
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn service(&self) -> &ServiceInstance {
        &self.service
    }

    /// Run the synchronous validate operation on `model`
    pub fn validate(
        &self,
        model: &dyn RequestModel,
        model_type: &ModelType,
    ) -> Result<ValidationOutcome, DispatchError> {
        let view = model_view(model, model_type)?;
        self.operation
            .validate(self.service.as_ref(), view)
            .ok_or_else(|| self.unsupported(model_type))
    }

    /// Run the asynchronous validate operation on `model`
    ///
    /// Resolves to [`DispatchError::Cancelled`] as soon as `cancellation`
    /// fires, whether or not the validator observes the token itself.
    pub async fn validate_async(
        &self,
        model: &dyn RequestModel,
        model_type: &ModelType,
        cancellation: CancellationToken,
    ) -> Result<ValidationOutcome, DispatchError> {
        let view = model_view(model, model_type)?;
        let validation = self
            .operation
            .validate_async(self.service.as_ref(), view, cancellation.clone())
            .ok_or_else(|| self.unsupported(model_type))?;

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(DispatchError::Cancelled {
                model_type: model_type.name(),
            }),
            outcome = validation => Ok(outcome),
        }
    }

    fn unsupported(&self, model_type: &ModelType) -> DispatchError {
        DispatchError::UnsupportedValidatorContract {
            model_type: model_type.name(),
            service_key: self.key.name(),
        }
    }
}

impl fmt::Debug for ResolutionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEntry")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn model_view<'m>(
    model: &'m dyn RequestModel,
    model_type: &ModelType,
) -> Result<&'m (dyn std::any::Any + Send + Sync), DispatchError> {
    model.view(model_type).ok_or_else(|| {
        DispatchError::Internal(format!(
            "argument of type '{}' is not an instance of '{}'",
            model.model_name(),
            model_type.name()
        ))
    })
}

/// Model type → resolved validator
#[derive(Default)]
pub struct ResolutionCache {
    entries: DashMap<ModelType, ResolutionEntry>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the validator of `model_type`, from the cache when possible
    ///
    /// On a miss the validator service is requested from `services` and
    /// checked against the model's validate operation before it is cached.
    pub fn resolve(
        &self,
        model_type: &ModelType,
        services: &dyn ServiceLocator,
    ) -> Result<ResolutionEntry, DispatchError> {
        if let Some(entry) = self.entries.get(model_type) {
            return Ok(entry.clone());
        }

        let key = model_type.validator_key();
        let service = services
            .get_service(&key)
            .ok_or(DispatchError::MissingValidator {
                model_type: model_type.name(),
            })?;

        let operation = model_type.operation();
        if !operation.supports(service.as_ref()) {
            return Err(DispatchError::UnsupportedValidatorContract {
                model_type: model_type.name(),
                service_key: key.name(),
            });
        }

        let entry = ResolutionEntry {
            key,
            operation,
            service,
        };
        self.entries.insert(*model_type, entry.clone());
        tracing::debug!(model_type = model_type.name(), "validator resolved and cached");

        Ok(entry)
    }

    pub fn contains(&self, model_type: &ModelType) -> bool {
        self.entries.contains_key(model_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Action → whether it carries the [`SkipValidation`] marker
#[derive(Default)]
pub struct SkipMarkerCache {
    entries: DashMap<ActionId, bool>,
}

impl SkipMarkerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether validation is disabled for `action`
    pub fn has_skip_marker(&self, action: &ActionDescriptor) -> bool {
        if let Some(skip) = self.entries.get(&action.id()) {
            return *skip;
        }

        let skip = action.has_marker::<SkipValidation>();
        self.entries.insert(action.id(), skip);
        skip
    }

    /// The cached answer for an action, if it was computed already
    pub fn cached(&self, id: &ActionId) -> Option<bool> {
        self.entries.get(id).map(|skip| *skip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::ValidationFailure;
    use crate::core::service::ServiceRegistry;
    use crate::core::validator::ValidatorService;
    use crate::impl_request_model;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Invoice {
        total: i64,
    }

    struct Receipt;

    impl_request_model!(Invoice);
    impl_request_model!(Receipt);

    /// Locator counting how often it is asked for a service
    struct CountingLocator {
        inner: ServiceRegistry,
        lookups: AtomicUsize,
    }

    impl ServiceLocator for CountingLocator {
        fn get_service(&self, key: &ServiceKey) -> Option<ServiceInstance> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.get_service(key)
        }
    }

    fn invoice_registry() -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        registry.add_validator_fn(|invoice: &Invoice| {
            if invoice.total < 0 {
                ValidationOutcome::from_failures(vec![ValidationFailure::new(
                    "total",
                    "must not be negative",
                )])
            } else {
                ValidationOutcome::valid()
            }
        });
        registry
    }

    #[test]
    fn test_resolve_queries_locator_once() {
        let locator = CountingLocator {
            inner: invoice_registry(),
            lookups: AtomicUsize::new(0),
        };
        let cache = ResolutionCache::new();
        let model_type = ModelType::of::<Invoice>();

        let first = cache.resolve(&model_type, &locator).unwrap();
        let second = cache.resolve(&model_type, &locator).unwrap();

        assert_eq!(locator.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(first.key(), second.key());
        assert!(Arc::ptr_eq(first.service(), second.service()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_debug_names_validator_key() {
        let cache = ResolutionCache::new();
        let entry = cache
            .resolve(&ModelType::of::<Invoice>(), &invoice_registry())
            .unwrap();
        let printed = format!("{:?}", entry);
        assert!(printed.starts_with("ResolutionEntry"), "{}", printed);
        assert!(printed.contains("ValidatorService"), "{}", printed);
    }

    #[test]
    fn test_resolved_entry_validates() {
        let cache = ResolutionCache::new();
        let model_type = ModelType::of::<Invoice>();
        let entry = cache.resolve(&model_type, &invoice_registry()).unwrap();

        let outcome = entry.validate(&Invoice { total: -5 }, &model_type).unwrap();
        assert_eq!(outcome.failures[0].field, "total");
        assert!(entry.validate(&Invoice { total: 5 }, &model_type).unwrap().is_valid());
    }

    #[test]
    fn test_missing_validator() {
        let cache = ResolutionCache::new();
        let err = cache
            .resolve(&ModelType::of::<Receipt>(), &invoice_registry())
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingValidator { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unsupported_contract() {
        let mut registry = ServiceRegistry::new();
        registry.register(
            ServiceKey::of::<ValidatorService<Receipt>>(),
            Arc::new("a validator from an incompatible library"),
        );
        let cache = ResolutionCache::new();
        let err = cache
            .resolve(&ModelType::of::<Receipt>(), &registry)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedValidatorContract { .. }));
        assert!(!cache.contains(&ModelType::of::<Receipt>()));
    }

    #[tokio::test]
    async fn test_validate_async_observes_cancellation() {
        let cache = ResolutionCache::new();
        let model_type = ModelType::of::<Invoice>();
        let entry = cache.resolve(&model_type, &invoice_registry()).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = entry
            .validate_async(&Invoice { total: 1 }, &model_type, token)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled { .. }));
    }

    #[test]
    fn test_skip_marker_cached_per_action() {
        let cache = SkipMarkerCache::new();
        let skipped = ActionDescriptor::new("health").with_marker(SkipValidation);
        let checked = ActionDescriptor::new("create");

        assert!(cache.has_skip_marker(&skipped));
        assert!(!cache.has_skip_marker(&checked));
        assert!(cache.has_skip_marker(&skipped));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.cached(&skipped.id()), Some(true));
        assert_eq!(cache.cached(&checked.id()), Some(false));
    }
}
