//! Typed error handling for validation dispatch
//!
//! Validation *failures* are never errors: they become responses through the
//! invalid-response strategy. The types here cover the cases that abort a
//! request instead.
//!
//! # Error Categories
//!
//! - [`DispatchError`]: resolution and execution errors raised while running
//!   the validation filters. They surface as the generic unhandled-error
//!   response.
//! - [`ConfigError`]: errors raised while loading or checking configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! match pipeline.execute(arguments, abort, runtime).await {
//!     Ok(response) => response,
//!     Err(DispatchError::MissingValidator { model_type }) => {
//!         tracing::error!(model_type, "no validator registered");
//!         StatusCode::INTERNAL_SERVER_ERROR.into_response()
//!     }
//!     Err(e) => e.into_response(),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Errors that abort validation dispatch for a request
///
/// None of these are retried. They propagate out of the filter chain and are
/// rendered by [`IntoResponse`] as a generic server error.
#[derive(Debug)]
pub enum DispatchError {
    /// No validator is registered for a model type that required validation
    MissingValidator { model_type: &'static str },

    /// A service is registered under the validator key, but it does not expose
    /// the validate operation expected for the model type
    UnsupportedValidatorContract {
        model_type: &'static str,
        service_key: &'static str,
    },

    /// A required service is absent from the locator
    MissingService { service_key: &'static str },

    /// The request was aborted while its model was being validated
    Cancelled { model_type: &'static str },

    /// Internal dispatch errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::MissingValidator { model_type } => {
                write!(f, "No validator registered for model type '{}'", model_type)
            }
            DispatchError::UnsupportedValidatorContract {
                model_type,
                service_key,
            } => {
                write!(
                    f,
                    "Service '{}' does not expose a validate operation for model type '{}'",
                    service_key, model_type
                )
            }
            DispatchError::MissingService { service_key } => {
                write!(f, "Required service '{}' is not registered", service_key)
            }
            DispatchError::Cancelled { model_type } => {
                write!(
                    f,
                    "Validation of model type '{}' was cancelled by the request",
                    model_type
                )
            }
            DispatchError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DispatchError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DispatchError::MissingValidator { .. } => "MISSING_VALIDATOR",
            DispatchError::UnsupportedValidatorContract { .. } => {
                "UNSUPPORTED_VALIDATOR_CONTRACT"
            }
            DispatchError::MissingService { .. } => "MISSING_SERVICE",
            DispatchError::Cancelled { .. } => "VALIDATION_CANCELLED",
            DispatchError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DispatchError::MissingValidator { model_type }
            | DispatchError::Cancelled { model_type } => {
                Some(serde_json::json!({ "model_type": model_type }))
            }
            DispatchError::UnsupportedValidatorContract {
                model_type,
                service_key,
            } => Some(serde_json::json!({
                "model_type": model_type,
                "service_key": service_key
            })),
            _ => None,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
