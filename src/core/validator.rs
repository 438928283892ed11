//! Validator contract and the type-erased validate operation
//!
//! Validators are typed ([`ModelValidator<M>`]) and registered at startup as a
//! [`ValidatorService<M>`]. The dispatcher only knows models as `dyn Any`, so
//! each [`ModelType`](super::model::ModelType) carries a [`ValidateOperation`]:
//! a small table of functions monomorphized for the model that downcast the
//! service and the model and forward the call.

use super::outcome::ValidationOutcome;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use validator::Validate;

/// A validator for the model type `M`
///
/// `validate_async` defaults to the synchronous path; override it for
/// validators that need I/O. Validators are free to observe the cancellation
/// token, the async dispatcher stops waiting on them once it fires.
#[async_trait]
pub trait ModelValidator<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    /// Validate a model synchronously
    fn validate(&self, model: &M) -> ValidationOutcome;

    /// Validate a model asynchronously
    async fn validate_async(
        &self,
        model: &M,
        cancellation: CancellationToken,
    ) -> ValidationOutcome {
        let _ = cancellation;
        self.validate(model)
    }
}

/// The service registered under the validator key of `M`
pub struct ValidatorService<M: Send + Sync + 'static>(Arc<dyn ModelValidator<M>>);

impl<M: Send + Sync + 'static> ValidatorService<M> {
    pub fn new(validator: impl ModelValidator<M> + 'static) -> Self {
        Self(Arc::new(validator))
    }
}

/// Type-erased validate operation for one model type
///
/// Every function returns `None` when the service or the model is not of the
/// expected type.
#[derive(Clone, Copy)]
pub struct ValidateOperation {
    supports: fn(&(dyn Any + Send + Sync)) -> bool,
    validate: fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> Option<ValidationOutcome>,
    validate_async: for<'a> fn(
        &'a (dyn Any + Send + Sync),
        &'a (dyn Any + Send + Sync),
        CancellationToken,
    ) -> Option<BoxFuture<'a, ValidationOutcome>>,
}

impl ValidateOperation {
    /// Operation table for the model type `M`
    pub fn of<M: Send + Sync + 'static>() -> Self {
        Self {
            supports: supports::<M>,
            validate: validate::<M>,
            validate_async: validate_async::<M>,
        }
    }

    /// Whether `service` exposes this validate operation
    pub fn supports(&self, service: &(dyn Any + Send + Sync)) -> bool {
        (self.supports)(service)
    }

    pub fn validate(
        &self,
        service: &(dyn Any + Send + Sync),
        model: &(dyn Any + Send + Sync),
    ) -> Option<ValidationOutcome> {
        (self.validate)(service, model)
    }

    pub fn validate_async<'a>(
        &self,
        service: &'a (dyn Any + Send + Sync),
        model: &'a (dyn Any + Send + Sync),
        cancellation: CancellationToken,
    ) -> Option<BoxFuture<'a, ValidationOutcome>> {
        (self.validate_async)(service, model, cancellation)
    }
}

fn supports<M: Send + Sync + 'static>(service: &(dyn Any + Send + Sync)) -> bool {
    service.is::<ValidatorService<M>>()
}

fn validate<M: Send + Sync + 'static>(
    service: &(dyn Any + Send + Sync),
    model: &(dyn Any + Send + Sync),
) -> Option<ValidationOutcome> {
    let service = service.downcast_ref::<ValidatorService<M>>()?;
    let model = model.downcast_ref::<M>()?;
    Some(service.0.validate(model))
}

fn validate_async<'a, M: Send + Sync + 'static>(
    service: &'a (dyn Any + Send + Sync),
    model: &'a (dyn Any + Send + Sync),
    cancellation: CancellationToken,
) -> Option<BoxFuture<'a, ValidationOutcome>> {
    let service = service.downcast_ref::<ValidatorService<M>>()?;
    let model = model.downcast_ref::<M>()?;
    Some(service.0.validate_async(model, cancellation))
}

/// Validator backed by a closure
pub struct FnValidator<M, F> {
    f: F,
    _model: PhantomData<fn(&M)>,
}

impl<M, F> FnValidator<M, F>
where
    F: Fn(&M) -> ValidationOutcome + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _model: PhantomData,
        }
    }
}

impl<M, F> ModelValidator<M> for FnValidator<M, F>
where
    M: Send + Sync + 'static,
    F: Fn(&M) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, model: &M) -> ValidationOutcome {
        (self.f)(model)
    }
}

/// Validator running the rules declared with `#[derive(validator::Validate)]`
pub struct RuleValidator<M>(PhantomData<fn(&M)>);

impl<M> RuleValidator<M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for RuleValidator<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ModelValidator<M> for RuleValidator<M>
where
    M: Validate + Send + Sync + 'static,
{
    fn validate(&self, model: &M) -> ValidationOutcome {
        match model.validate() {
            Ok(()) => ValidationOutcome::valid(),
            Err(errors) => errors.into(),
        }
    }
}
