//! Invalid-response strategies
//!
//! When a model fails validation the dispatcher asks the registered
//! [`InvalidResponse`] strategy for the response to short-circuit the action
//! with. Without one, [`DefaultInvalidResponse`] renders the failure list as a
//! JSON array with a "bad request" class status.

use super::model::RequestModel;
use super::outcome::ValidationFailure;
use super::service::{ServiceKey, ServiceLocator};
use async_trait::async_trait;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Converts failed validation into the response returned to the client
///
/// `get_result` is used by the synchronous dispatcher and `get_result_async`
/// by the asynchronous one.
#[async_trait]
pub trait InvalidResponse: Send + Sync {
    /// Build the response for a model that failed validation
    fn get_result(&self, model: &dyn RequestModel, failures: &[ValidationFailure]) -> Response;

    /// Build the response for a model that failed asynchronous validation
    async fn get_result_async(
        &self,
        model: &dyn RequestModel,
        failures: &[ValidationFailure],
        cancellation: CancellationToken,
    ) -> Response {
        let _ = cancellation;
        self.get_result(model, failures)
    }
}

/// Response used when no strategy is registered
///
/// The body is exactly the failure list.
#[derive(Debug, Clone, Copy)]
pub struct DefaultInvalidResponse {
    status: StatusCode,
}

impl DefaultInvalidResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Default for DefaultInvalidResponse {
    fn default() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }
}

impl InvalidResponse for DefaultInvalidResponse {
    fn get_result(&self, _model: &dyn RequestModel, failures: &[ValidationFailure]) -> Response {
        (self.status, Json(failures.to_vec())).into_response()
    }
}

/// Strategy built from a closure over the failure list
pub struct FnInvalidResponse<F> {
    f: F,
}

impl<F> FnInvalidResponse<F>
where
    F: Fn(&[ValidationFailure]) -> Response + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> InvalidResponse for FnInvalidResponse<F>
where
    F: Fn(&[ValidationFailure]) -> Response + Send + Sync,
{
    fn get_result(&self, _model: &dyn RequestModel, failures: &[ValidationFailure]) -> Response {
        (self.f)(failures)
    }
}

/// The service registered for a custom strategy
pub struct InvalidResponseService(Arc<dyn InvalidResponse>);

impl InvalidResponseService {
    pub fn new(strategy: impl InvalidResponse + 'static) -> Self {
        Self(Arc::new(strategy))
    }

    pub fn key() -> ServiceKey {
        ServiceKey::of::<InvalidResponseService>()
    }

    /// Look up the registered strategy
    ///
    /// A service of another type under the strategy key counts as no strategy.
    pub fn resolve(services: &dyn ServiceLocator) -> Option<Arc<dyn InvalidResponse>> {
        let service = services.get_service(&Self::key())?;
        service
            .downcast_ref::<InvalidResponseService>()
            .map(|registered| registered.0.clone())
    }
}
