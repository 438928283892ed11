//! # This-Validate
//!
//! Declarative request-model validation for axum actions.
//!
//! ## Features
//!
//! - **Declarative Filters**: Attach `Validate` / `ValidateAsync` to an action with the model types to check
//! - **Cached Resolution**: Validators are looked up once per model type and cached for the process lifetime
//! - **Endpoint Groups**: Attach filters once to every endpoint under a prefix
//! - **Skip Marker**: `SkipValidation` disables every validation filter on an action, including group-wide ones
//! - **Pluggable Responses**: Replace the default `400` failure list with your own strategy
//! - **Cancellation**: The async dispatcher observes the request's abort token
//! - **Rule Bridge**: Reuse `#[derive(validator::Validate)]` rules as validators
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use this_validate::prelude::*;
//!
//! #[derive(Deserialize, Validate)]
//! struct CreateSample {
//!     #[validate(length(min = 1, message = "Name required"))]
//!     name: String,
//! }
//! impl_request_model!(CreateSample);
//!
//! let app = ServerBuilder::new()
//!     .with_rule_validator::<CreateSample>()
//!     .post(
//!         "/api/samples",
//!         Endpoint::new("samples.create", create_sample)
//!             .bind(JsonBody::<CreateSample>::new("request"))
//!             .validate([ModelType::of::<CreateSample>()]),
//!     )
//!     .build()?;
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod pipeline;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{ConfigError, DispatchError, ErrorResponse},
        model::{ModelType, RequestModel},
        outcome::{Severity, ValidationFailure, ValidationOutcome},
        response::{DefaultInvalidResponse, FnInvalidResponse, InvalidResponse},
        service::{ServiceKey, ServiceLocator, ServiceRegistry},
        validator::{FnValidator, ModelValidator, RuleValidator, ValidatorService},
    };

    // === Macros ===
    pub use crate::impl_request_model;

    // === Pipeline ===
    pub use crate::pipeline::{
        ActionArguments, ActionContext, ActionDescriptor, ActionFilter, ActionMarker,
        ActionPipeline, Next, SkipValidation,
    };

    // === Dispatch ===
    pub use crate::dispatch::{Validate, ValidateAsync, ValidationRuntime};

    // === Config ===
    pub use crate::config::{FailurePolicy, ValidationConfig};

    // === Server ===
    pub use crate::server::{
        Endpoint, EndpointGroup, JsonBody, ModelBinder, QueryParams, ServerBuilder,
        ValidationHost,
    };

    // === Re-exports ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}
