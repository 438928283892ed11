//! Validation outcomes produced by validators
//!
//! An outcome is created fresh for every validation call and discarded once
//! the request has been answered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{ValidationErrors, ValidationErrorsKind};

/// How serious a failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

/// A single field-level failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Path of the offending field (e.g. `body.name`, `items[1].sku`)
    pub field: String,

    /// Human-readable message
    pub message: String,

    /// Machine-readable rule code (e.g. `length`, `email`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// The value that was rejected, when the rule reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_value: Option<Value>,

    #[serde(default)]
    pub severity: Severity,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
            attempted_value: None,
            severity: Severity::Error,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_attempted_value(mut self, value: Value) -> Self {
        self.attempted_value = Some(value);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Result of validating one model instance
///
/// The outcome is valid when it carries no failures at all, whatever their
/// severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationOutcome {
    /// An outcome without failures
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }
}

impl From<Vec<ValidationFailure>> for ValidationOutcome {
    fn from(failures: Vec<ValidationFailure>) -> Self {
        Self::from_failures(failures)
    }
}

impl From<ValidationErrors> for ValidationOutcome {
    /// Flatten `validator` errors into dotted/indexed field paths
    ///
    /// `HashMap` iteration order is unstable, so failures are sorted by path.
    /// Failures of one field keep the order the rules reported them in.
    fn from(errors: ValidationErrors) -> Self {
        let mut failures = Vec::new();
        flatten_errors("", &errors, &mut failures);
        failures.sort_by(|a, b| a.field.cmp(&b.field));
        Self { failures }
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<ValidationFailure>) {
    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &field.to_string());
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("'{}' failed the '{}' rule", path, error.code),
                    };
                    let mut failure =
                        ValidationFailure::new(path.clone(), message).with_code(error.code.to_string());
                    if let Some(value) = error.params.get("value") {
                        failure = failure.with_attempted_value(value.clone());
                    }
                    out.push(failure);
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_errors(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}
