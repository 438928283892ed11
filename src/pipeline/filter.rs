//! Interceptors around an action and the handler at the end of the chain

use super::action::{ActionArguments, ActionContext};
use crate::core::error::DispatchError;
use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// An interceptor running before the action body
///
/// Filters run in ascending [`order`](ActionFilter::order); filters with the
/// same order keep their declaration order. A filter continues the chain by
/// calling [`Next::run`], and can answer the request itself by setting the
/// context result.
#[async_trait]
pub trait ActionFilter: Send + Sync {
    /// Execution order, lower runs first
    fn order(&self) -> i32 {
        0
    }

    async fn on_action_execution(
        &self,
        ctx: &mut ActionContext,
        next: Next<'_>,
    ) -> Result<(), DispatchError>;
}

/// The action body
pub trait ActionHandler: Send + Sync {
    fn call(&self, arguments: ActionArguments) -> BoxFuture<'static, Response>;
}

impl<F, Fut, R> ActionHandler for F
where
    F: Fn(ActionArguments) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, arguments: ActionArguments) -> BoxFuture<'static, Response> {
        let future = (self)(arguments);
        Box::pin(async move { future.await.into_response() })
    }
}

/// The remaining stages of the pipeline
pub struct Next<'a> {
    filters: &'a [Arc<dyn ActionFilter>],
    handler: &'a dyn ActionHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(filters: &'a [Arc<dyn ActionFilter>], handler: &'a dyn ActionHandler) -> Self {
        Self { filters, handler }
    }

    /// Run the next filter, or the action body once every filter has run
    ///
    /// Nothing runs when the context already holds a result.
    pub fn run<'c>(self, ctx: &'c mut ActionContext) -> BoxFuture<'c, Result<(), DispatchError>>
    where
        'a: 'c,
    {
        Box::pin(async move {
            if ctx.has_result() {
                tracing::debug!(
                    action = ctx.action().name(),
                    "result already set, skipping remaining stages"
                );
                return Ok(());
            }

            match self.filters.split_first() {
                Some((filter, rest)) => {
                    let next = Next::new(rest, self.handler);
                    filter.on_action_execution(ctx, next).await
                }
                None => {
                    let arguments = ctx.arguments().clone();
                    let response = self.handler.call(arguments).await;
                    ctx.set_result(response);
                    Ok(())
                }
            }
        })
    }
}
