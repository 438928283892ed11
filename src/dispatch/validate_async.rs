//! Asynchronous validation filter

use super::{CollectedFailures, FailureAction};
use crate::core::error::DispatchError;
use crate::core::model::ModelType;
use crate::pipeline::action::ActionContext;
use crate::pipeline::filter::{ActionFilter, Next};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Validates the declared models with their asynchronous validate operation
///
/// By default the request's abort token is handed to the validators and to the
/// invalid-response strategy, and an aborted request fails with
/// [`DispatchError::Cancelled`]. With
/// [`with_cancellation_token(false)`](Self::with_cancellation_token) they get
/// a token that is never cancelled.
#[derive(Debug, Clone)]
pub struct ValidateAsync {
    model_types: Vec<ModelType>,
    order: i32,
    cancellation_token_active: bool,
}

impl ValidateAsync {
    pub fn new(model_types: impl IntoIterator<Item = ModelType>) -> Self {
        Self {
            model_types: model_types.into_iter().collect(),
            order: 0,
            cancellation_token_active: true,
        }
    }

    /// Validate a single model type
    pub fn of<M: Send + Sync + 'static>() -> Self {
        Self::new([ModelType::of::<M>()])
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Whether the request's abort token is propagated
    pub fn with_cancellation_token(mut self, active: bool) -> Self {
        self.cancellation_token_active = active;
        self
    }

    pub fn model_types(&self) -> &[ModelType] {
        &self.model_types
    }

    pub fn is_cancellation_token_active(&self) -> bool {
        self.cancellation_token_active
    }

    fn cancellation_token(&self, ctx: &ActionContext) -> CancellationToken {
        if self.cancellation_token_active {
            ctx.request_aborted().clone()
        } else {
            CancellationToken::new()
        }
    }
}

#[async_trait]
impl ActionFilter for ValidateAsync {
    fn order(&self) -> i32 {
        self.order
    }

    async fn on_action_execution(
        &self,
        ctx: &mut ActionContext,
        next: Next<'_>,
    ) -> Result<(), DispatchError> {
        let runtime = ctx.runtime().clone();

        if runtime.should_skip(ctx.action()) {
            tracing::debug!(action = ctx.action().name(), "validation skipped by marker");
            return next.run(ctx).await;
        }

        let cancellation = self.cancellation_token(ctx);
        let action = FailureAction::for_policy(runtime.config().failure_policy);
        let mut collected = CollectedFailures::default();

        for model_type in &self.model_types {
            let Some(model) = ctx.arguments().first_instance_of(model_type) else {
                continue;
            };

            let entry = runtime.resolve(model_type)?;
            let outcome = entry
                .validate_async(model.as_ref(), model_type, cancellation.clone())
                .await?;
            if outcome.is_valid() {
                continue;
            }

            tracing::warn!(
                action = ctx.action().name(),
                model_type = model_type.name(),
                failures = outcome.failures.len(),
                "model failed validation"
            );

            match action {
                FailureAction::Respond { stop } => {
                    let response = runtime
                        .invalid_response()
                        .get_result_async(model.as_ref(), &outcome.failures, cancellation.clone())
                        .await;
                    ctx.set_result(response);
                    if stop {
                        break;
                    }
                }
                FailureAction::Collect => collected.push(&model, outcome.into_failures()),
            }
        }

        if let Some((model, failures)) = collected.finish() {
            let response = runtime
                .invalid_response()
                .get_result_async(model.as_ref(), &failures, cancellation.clone())
                .await;
            ctx.set_result(response);
        }

        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RequestModel;
    use crate::core::outcome::{ValidationFailure, ValidationOutcome};
    use crate::core::response::InvalidResponse;
    use crate::core::service::ServiceRegistry;
    use crate::core::validator::ModelValidator;
    use crate::dispatch::ValidationRuntime;
    use crate::impl_request_model;
    use crate::pipeline::{ActionArguments, ActionDescriptor, ActionPipeline};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use std::sync::{Arc, Mutex};

    struct Upload {
        file_name: String,
    }

    impl_request_model!(Upload);

    /// Keeps the token it was handed and rejects empty file names
    #[derive(Default)]
    struct TokenRecorder {
        seen: Mutex<Option<CancellationToken>>,
    }

    #[async_trait]
    impl ModelValidator<Upload> for Arc<TokenRecorder> {
        fn validate(&self, upload: &Upload) -> ValidationOutcome {
            if upload.file_name.is_empty() {
                ValidationOutcome::from_failures(vec![ValidationFailure::new(
                    "file_name",
                    "file name required",
                )])
            } else {
                ValidationOutcome::valid()
            }
        }

        async fn validate_async(
            &self,
            upload: &Upload,
            cancellation: CancellationToken,
        ) -> ValidationOutcome {
            *self.seen.lock().unwrap() = Some(cancellation);
            self.validate(upload)
        }
    }

    /// Never finishes on its own
    struct Stalled;

    #[async_trait]
    impl ModelValidator<Upload> for Stalled {
        fn validate(&self, _upload: &Upload) -> ValidationOutcome {
            ValidationOutcome::valid()
        }

        async fn validate_async(
            &self,
            _upload: &Upload,
            _cancellation: CancellationToken,
        ) -> ValidationOutcome {
            futures::future::pending().await
        }
    }

    /// Strategy answering 422 and counting its calls
    #[derive(Default)]
    struct Unprocessable {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl InvalidResponse for Arc<Unprocessable> {
        fn get_result(&self, _model: &dyn RequestModel, _failures: &[ValidationFailure]) -> Response {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }

        async fn get_result_async(
            &self,
            _model: &dyn RequestModel,
            failures: &[ValidationFailure],
            _cancellation: CancellationToken,
        ) -> Response {
            *self.calls.lock().unwrap() += 1;
            (StatusCode::UNPROCESSABLE_ENTITY, failures.len().to_string()).into_response()
        }
    }

    fn upload(file_name: &str) -> ActionArguments {
        ActionArguments::new().with(
            "upload",
            Upload {
                file_name: file_name.to_string(),
            },
        )
    }

    fn pipeline(filter: ValidateAsync) -> ActionPipeline {
        ActionPipeline::new(ActionDescriptor::new("files.upload"), |_: ActionArguments| async {
            StatusCode::CREATED
        })
        .with_filter(filter)
    }

    fn runtime(registry: ServiceRegistry) -> Arc<ValidationRuntime> {
        Arc::new(ValidationRuntime::new(Arc::new(registry)))
    }

    #[tokio::test]
    async fn test_request_token_is_propagated() {
        let recorder = Arc::new(TokenRecorder::default());
        let mut registry = ServiceRegistry::new();
        registry.add_validator::<Upload>(recorder.clone());

        let request_aborted = CancellationToken::new();
        let response = pipeline(ValidateAsync::of::<Upload>())
            .execute(upload("a.txt"), request_aborted.clone(), runtime(registry))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        request_aborted.cancel();
        let seen = recorder.seen.lock().unwrap().clone().unwrap();
        assert!(seen.is_cancelled());
    }

    #[tokio::test]
    async fn test_inactive_token_is_never_cancelled() {
        let recorder = Arc::new(TokenRecorder::default());
        let mut registry = ServiceRegistry::new();
        registry.add_validator::<Upload>(recorder.clone());

        let request_aborted = CancellationToken::new();
        pipeline(ValidateAsync::of::<Upload>().with_cancellation_token(false))
            .execute(upload("a.txt"), request_aborted.clone(), runtime(registry))
            .await
            .unwrap();

        request_aborted.cancel();
        let seen = recorder.seen.lock().unwrap().clone().unwrap();
        assert!(!seen.is_cancelled());
    }

    #[tokio::test]
    async fn test_aborted_request_cancels_validation() {
        let mut registry = ServiceRegistry::new();
        registry.add_validator::<Upload>(Stalled);

        let request_aborted = CancellationToken::new();
        let abort = request_aborted.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            abort.cancel();
        });

        let err = pipeline(ValidateAsync::of::<Upload>())
            .execute(upload("a.txt"), request_aborted, runtime(registry))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_CANCELLED");
    }

    #[tokio::test]
    async fn test_custom_strategy_uses_async_path_once() {
        let strategy = Arc::new(Unprocessable::default());
        let mut registry = ServiceRegistry::new();
        registry.add_validator::<Upload>(Arc::new(TokenRecorder::default()));
        registry.add_invalid_response(strategy.clone());

        let response = pipeline(ValidateAsync::of::<Upload>())
            .execute(upload(""), CancellationToken::new(), runtime(registry))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(*strategy.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_token_active_by_default() {
        assert!(ValidateAsync::of::<Upload>().is_cancellation_token_active());
        assert!(
            !ValidateAsync::of::<Upload>()
                .with_cancellation_token(false)
                .is_cancellation_token_active()
        );
    }
}
