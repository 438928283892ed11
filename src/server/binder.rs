//! Model binding from HTTP requests
//!
//! Binders run before the filter chain and produce the action arguments. A
//! request that cannot be bound never reaches the validation filters.

use crate::core::error::ErrorResponse;
use crate::core::model::RequestModel;
use axum::Json;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while binding a request to action arguments
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Request body is empty, expected JSON for '{argument}'")]
    MissingBody { argument: String },

    #[error("Malformed JSON body for '{argument}': {message}")]
    InvalidJson { argument: String, message: String },

    #[error("Malformed query string for '{argument}': {message}")]
    InvalidQuery { argument: String, message: String },

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Request body could not be read: {message}")]
    UnreadableBody { message: String },
}

impl BindingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BindingError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BindingError::MissingBody { .. } => "MISSING_BODY",
            BindingError::InvalidJson { .. } => "INVALID_JSON",
            BindingError::InvalidQuery { .. } => "INVALID_QUERY",
            BindingError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            BindingError::UnreadableBody { .. } => "UNREADABLE_BODY",
        }
    }
}

impl IntoResponse for BindingError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: None,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// The buffered parts of a request that binders read from
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Produces one named action argument from a request
pub trait ModelBinder: Send + Sync {
    /// Name of the argument this binder produces
    fn argument(&self) -> &str;

    fn bind(&self, request: &RequestData) -> Result<Arc<dyn RequestModel>, BindingError>;
}

/// Binds the JSON request body to `T`
pub struct JsonBody<T> {
    argument: String,
    _model: PhantomData<fn() -> T>,
}

impl<T> JsonBody<T> {
    pub fn new(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            _model: PhantomData,
        }
    }
}

impl<T> ModelBinder for JsonBody<T>
where
    T: RequestModel + DeserializeOwned,
{
    fn argument(&self) -> &str {
        &self.argument
    }

    fn bind(&self, request: &RequestData) -> Result<Arc<dyn RequestModel>, BindingError> {
        if request.body.is_empty() {
            return Err(BindingError::MissingBody {
                argument: self.argument.clone(),
            });
        }

        let model: T =
            serde_json::from_slice(&request.body).map_err(|e| BindingError::InvalidJson {
                argument: self.argument.clone(),
                message: e.to_string(),
            })?;
        Ok(Arc::new(model))
    }
}

/// Binds the query string to `T`
pub struct QueryParams<T> {
    argument: String,
    _model: PhantomData<fn() -> T>,
}

impl<T> QueryParams<T> {
    pub fn new(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            _model: PhantomData,
        }
    }
}

impl<T> ModelBinder for QueryParams<T>
where
    T: RequestModel + DeserializeOwned,
{
    fn argument(&self) -> &str {
        &self.argument
    }

    fn bind(&self, request: &RequestData) -> Result<Arc<dyn RequestModel>, BindingError> {
        let Query(model) =
            Query::<T>::try_from_uri(&request.uri).map_err(|e| BindingError::InvalidQuery {
                argument: self.argument.clone(),
                message: e.body_text(),
            })?;
        Ok(Arc::new(model))
    }
}
