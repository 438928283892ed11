//! Core module containing the validation contracts shared by dispatchers and hosts

pub mod error;
pub mod model;
pub mod outcome;
pub mod response;
pub mod service;
pub mod validator;

pub use error::{ConfigError, DispatchError, ErrorResponse};
pub use model::{ModelType, RequestModel};
pub use outcome::{Severity, ValidationFailure, ValidationOutcome};
pub use response::{DefaultInvalidResponse, FnInvalidResponse, InvalidResponse, InvalidResponseService};
pub use service::{ServiceInstance, ServiceKey, ServiceLocator, ServiceRegistry};
pub use validator::{FnValidator, ModelValidator, RuleValidator, ValidateOperation, ValidatorService};
