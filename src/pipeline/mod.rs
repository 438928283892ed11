//! Transport-agnostic action pipeline
//!
//! An [`ActionPipeline`] binds an action descriptor, its filters and its
//! handler. Hosts build the arguments (model binding is theirs) and call
//! [`ActionPipeline::execute`] once per request.

pub mod action;
pub mod filter;

pub use action::{
    ActionArguments, ActionContext, ActionDescriptor, ActionId, ActionMarker, SkipValidation,
};
pub use filter::{ActionFilter, ActionHandler, Next};

use crate::core::error::DispatchError;
use crate::dispatch::ValidationRuntime;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An action with its filter chain
pub struct ActionPipeline {
    descriptor: Arc<ActionDescriptor>,
    filters: Vec<Arc<dyn ActionFilter>>,
    handler: Arc<dyn ActionHandler>,
}

impl ActionPipeline {
    pub fn new(descriptor: ActionDescriptor, handler: impl ActionHandler + 'static) -> Self {
        Self::from_arc(descriptor, Arc::new(handler))
    }

    pub fn from_arc(descriptor: ActionDescriptor, handler: Arc<dyn ActionHandler>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            filters: Vec::new(),
            handler,
        }
    }

    /// Add a filter, keeping the chain sorted by order
    pub fn with_filter(mut self, filter: impl ActionFilter + 'static) -> Self {
        self.push_filter(Arc::new(filter));
        self
    }

    pub fn push_filter(&mut self, filter: Arc<dyn ActionFilter>) {
        self.filters.push(filter);
        // stable: equal orders keep declaration order
        self.filters.sort_by_key(|filter| filter.order());
    }

    pub fn descriptor(&self) -> &Arc<ActionDescriptor> {
        &self.descriptor
    }

    pub fn filters(&self) -> &[Arc<dyn ActionFilter>] {
        &self.filters
    }

    /// Run the filters and the action body for one request
    ///
    /// A chain that finishes without producing a result answers `204 No Content`.
    pub async fn execute(
        &self,
        arguments: ActionArguments,
        request_aborted: CancellationToken,
        runtime: Arc<ValidationRuntime>,
    ) -> Result<Response, DispatchError> {
        let mut ctx = ActionContext::new(
            self.descriptor.clone(),
            arguments,
            request_aborted,
            runtime,
        );

        Next::new(&self.filters, self.handler.as_ref())
            .run(&mut ctx)
            .await?;

        Ok(ctx
            .take_result()
            .unwrap_or_else(|| StatusCode::NO_CONTENT.into_response()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::ServiceRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records its label when it runs, optionally answering the request
    struct Recorder {
        label: &'static str,
        order: i32,
        answer: Option<StatusCode>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl ActionFilter for Recorder {
        fn order(&self) -> i32 {
            self.order
        }

        async fn on_action_execution(
            &self,
            ctx: &mut ActionContext,
            next: Next<'_>,
        ) -> Result<(), DispatchError> {
            self.log.lock().unwrap().push(self.label);
            if let Some(status) = self.answer {
                ctx.set_result(status.into_response());
            }
            next.run(ctx).await
        }
    }

    fn runtime() -> Arc<ValidationRuntime> {
        Arc::new(ValidationRuntime::new(Arc::new(ServiceRegistry::new())))
    }

    fn recorder(
        label: &'static str,
        order: i32,
        answer: Option<StatusCode>,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Recorder {
        Recorder {
            label,
            order,
            answer,
            log: log.clone(),
        }
    }

    fn body_pipeline(log: &Arc<Mutex<Vec<&'static str>>>) -> ActionPipeline {
        let body_log = log.clone();
        ActionPipeline::new(ActionDescriptor::new("orders.create"), move |_: ActionArguments| {
            body_log.lock().unwrap().push("body");
            async { StatusCode::CREATED }
        })
    }

    #[tokio::test]
    async fn test_filters_run_by_order_then_body() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = body_pipeline(&log)
            .with_filter(recorder("late", 10, None, &log))
            .with_filter(recorder("early", -1, None, &log))
            .with_filter(recorder("middle", 0, None, &log));

        let response = pipeline
            .execute(ActionArguments::new(), CancellationToken::new(), runtime())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(*log.lock().unwrap(), vec!["early", "middle", "late", "body"]);
    }

    #[tokio::test]
    async fn test_result_set_upstream_suppresses_body() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = body_pipeline(&log)
            .with_filter(recorder("reject", 0, Some(StatusCode::BAD_REQUEST), &log))
            .with_filter(recorder("after", 1, None, &log));

        let response = pipeline
            .execute(ActionArguments::new(), CancellationToken::new(), runtime())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(*log.lock().unwrap(), vec!["reject"]);
    }

    #[tokio::test]
    async fn test_equal_orders_keep_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = body_pipeline(&log)
            .with_filter(recorder("first", 0, None, &log))
            .with_filter(recorder("second", 0, None, &log));

        pipeline
            .execute(ActionArguments::new(), CancellationToken::new(), runtime())
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "body"]);
    }

    /// A filter that never calls the rest of the chain
    struct Swallow;

    #[async_trait]
    impl ActionFilter for Swallow {
        async fn on_action_execution(
            &self,
            _ctx: &mut ActionContext,
            _next: Next<'_>,
        ) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_chain_without_result_answers_no_content() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let response = body_pipeline(&log)
            .with_filter(Swallow)
            .execute(ActionArguments::new(), CancellationToken::new(), runtime())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(log.lock().unwrap().is_empty());
    }
}
