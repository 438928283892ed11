//! Configuration loading and management

use crate::core::error::ConfigError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the dispatchers do when more than one declared model fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep validating; each failing model replaces the previous response
    #[default]
    LastFailureWins,

    /// Stop at the first failing model
    FirstFailureWins,

    /// Validate every model and answer once with all failures, in
    /// declaration order
    Aggregate,
}

/// Configuration of the validation runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Policy applied when several declared models fail
    pub failure_policy: FailurePolicy,

    /// Status of the default invalid response
    pub invalid_status: u16,

    /// Largest request body the model binders accept
    pub max_body_bytes: usize,

    /// Wrap the router in an HTTP trace layer
    pub trace_requests: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            invalid_status: StatusCode::BAD_REQUEST.as_u16(),
            max_body_bytes: 2 * 1024 * 1024,
            trace_requests: false,
        }
    }
}

impl ValidationConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError {
                message: e.to_string(),
            },
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Check values serde cannot check
    pub fn check(&self) -> Result<(), ConfigError> {
        if !(400..500).contains(&self.invalid_status) {
            return Err(ConfigError::InvalidValue {
                field: "invalid_status".to_string(),
                value: self.invalid_status.to_string(),
                message: "must be a 4xx status code".to_string(),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_body_bytes".to_string(),
                value: "0".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Status of the default invalid response
    ///
    /// Falls back to `400 Bad Request` when the configured code is not a
    /// client error.
    pub fn invalid_status(&self) -> StatusCode {
        StatusCode::from_u16(self.invalid_status)
            .ok()
            .filter(|status| status.is_client_error())
            .unwrap_or(StatusCode::BAD_REQUEST)
    }
}
