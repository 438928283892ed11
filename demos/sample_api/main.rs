//! Sample API
//!
//! Every endpoint under /api/samples validates a request whose body is
//! required and whose name must not be empty, except /api/samples/unchecked:
//!
//! ```bash
//! curl -i -X POST localhost:3000/api/samples -d '{"name":"widget"}'   # 200
//! curl -i -X POST localhost:3000/api/samples -d '{"name":""}'         # 400
//! curl -i -X POST localhost:3000/api/samples                          # 400
//! ```

use anyhow::Result;
use axum::http::StatusCode;
use std::sync::Arc;
use this_validate::prelude::*;
use this_validate::server::{BindingError, RequestData};

#[derive(Debug, Deserialize)]
struct GetSampleRequest {
    #[serde(default)]
    name: Option<String>,
}

/// The action argument: an optional JSON body
#[derive(Debug)]
struct GetSampleRequestModel {
    body: Option<GetSampleRequest>,
}

impl_request_model!(GetSampleRequestModel);

/// Binds the whole request body, leaving it unset when the request has none
struct SampleBinder;

impl ModelBinder for SampleBinder {
    fn argument(&self) -> &str {
        "model"
    }

    fn bind(&self, request: &RequestData) -> Result<Arc<dyn RequestModel>, BindingError> {
        let body = if request.body.is_empty() {
            None
        } else {
            serde_json::from_slice(&request.body).map_err(|e| BindingError::InvalidJson {
                argument: "model".to_string(),
                message: e.to_string(),
            })?
        };
        Ok(Arc::new(GetSampleRequestModel { body }))
    }
}

struct GetSampleRequestValidator;

impl ModelValidator<GetSampleRequestModel> for GetSampleRequestValidator {
    fn validate(&self, model: &GetSampleRequestModel) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::valid();
        match &model.body {
            None => outcome.push(
                ValidationFailure::new("Body", "'Body' must not be empty.").with_code("not_null"),
            ),
            Some(body) if body.name.as_deref().is_none_or(str::is_empty) => outcome.push(
                ValidationFailure::new("Body.Name", "'Body Name' must not be empty.")
                    .with_code("not_empty"),
            ),
            Some(_) => {}
        }
        outcome
    }
}

async fn get_sample(arguments: ActionArguments) -> StatusCode {
    if let Some(model) = arguments.get_as::<GetSampleRequestModel>("model") {
        tracing::info!(?model, "sample accepted");
    }
    StatusCode::OK
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sample_api=info,this_validate=debug".into()),
        )
        .init();

    let config = match std::env::var("SAMPLE_API_CONFIG") {
        Ok(path) => ValidationConfig::from_yaml_file(path)?,
        Err(_) => ValidationConfig {
            trace_requests: true,
            ..Default::default()
        },
    };

    let samples = EndpointGroup::new("/api/samples")
        .validate([ModelType::of::<GetSampleRequestModel>()])
        .post(
            "",
            Endpoint::new("samples.get_sample", get_sample).bind(SampleBinder),
        )
        .post(
            "/unchecked",
            Endpoint::new("samples.get_sample_unchecked", get_sample)
                .bind(SampleBinder)
                .skip_validation(),
        );

    ServerBuilder::new()
        .with_config(config)
        .with_validator::<GetSampleRequestModel>(GetSampleRequestValidator)
        .group(samples)
        .post(
            "/api/samples/async",
            Endpoint::new("samples.get_sample_async", get_sample)
                .bind(SampleBinder)
                .validate_async([ModelType::of::<GetSampleRequestModel>()]),
        )
        .serve("127.0.0.1:3000")
        .await
}
