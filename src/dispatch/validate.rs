//! Synchronous validation filter

use super::{CollectedFailures, FailureAction};
use crate::core::error::DispatchError;
use crate::core::model::ModelType;
use crate::pipeline::action::ActionContext;
use crate::pipeline::filter::{ActionFilter, Next};
use async_trait::async_trait;

/// Validates the declared models with their synchronous validate operation
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = ActionPipeline::new(ActionDescriptor::new("samples.create"), create_sample)
///     .with_filter(Validate::of::<CreateSample>());
/// ```
#[derive(Debug, Clone)]
pub struct Validate {
    model_types: Vec<ModelType>,
    order: i32,
}

impl Validate {
    pub fn new(model_types: impl IntoIterator<Item = ModelType>) -> Self {
        Self {
            model_types: model_types.into_iter().collect(),
            order: 0,
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

    pub fn model_types(&self) -> &[ModelType] {
        &self.model_types
    }
}

#[async_trait]
impl ActionFilter for Validate {
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

        let action = FailureAction::for_policy(runtime.config().failure_policy);
        let mut collected = CollectedFailures::default();

        for model_type in &self.model_types {
            let Some(model) = ctx.arguments().first_instance_of(model_type) else {
                continue;
            };

            let entry = runtime.resolve(model_type)?;
            let outcome = entry.validate(model.as_ref(), model_type)?;
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
                        .get_result(model.as_ref(), &outcome.failures);
                    ctx.set_result(response);
                    if stop {
                        break;
                    }
                }
                FailureAction::Collect => collected.push(&model, outcome.into_failures()),
            }
        }

        if let Some((model, failures)) = collected.finish() {
            let response = runtime.invalid_response().get_result(model.as_ref(), &failures);
            ctx.set_result(response);
        }

        next.run(ctx).await
    }
}
