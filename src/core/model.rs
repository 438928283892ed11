//! Request models and the type descriptors used to declare them
//!
//! A dispatcher is configured with an ordered list of [`ModelType`]s. At request
//! time it looks for the first action argument that *is* each declared type,
//! which is answered by [`RequestModel::view`].

use super::service::ServiceKey;
use super::validator::{ValidateOperation, ValidatorService};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Descriptor of a model type a dispatcher validates
///
/// Built with [`ModelType::of`]. Besides the type identity it carries the key
/// under which the model's validator is registered and the validate operation
/// monomorphized for the model, so the dispatcher never needs the static type.
#[derive(Clone, Copy)]
pub struct ModelType {
    id: TypeId,
    name: &'static str,
    validator_key: ServiceKey,
    operation: ValidateOperation,
}

impl ModelType {
    /// Descriptor for the model type `M`
    pub fn of<M: Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
            validator_key: ServiceKey::of::<ValidatorService<M>>(),
            operation: ValidateOperation::of::<M>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, for logs and error messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether this descriptor stands for `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Key of the validator service expected for this model type
    pub fn validator_key(&self) -> ServiceKey {
        self.validator_key
    }

    /// Validate operation bound to this model type
    pub fn operation(&self) -> ValidateOperation {
        self.operation
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelType {}

impl Hash for ModelType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelType").field(&self.name).finish()
    }
}

/// A value that can be passed to an action as an argument
///
/// Implement it with [`impl_request_model!`](crate::impl_request_model). A
/// model matches a declared [`ModelType`] when `view` returns a value for it:
/// by default only the exact type matches, and wrapper models may expose the
/// types they embed so that validators declared for those types apply to them.
pub trait RequestModel: Any + Send + Sync {
    /// The model as a type-erased value
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    /// Name of the concrete model type
    fn model_name(&self) -> &'static str;

    /// The model seen as `model_type`, if it is an instance of it
    fn view(&self, model_type: &ModelType) -> Option<&(dyn Any + Send + Sync)> {
        let any = self.as_any();
        ((*any).type_id() == model_type.id()).then_some(any)
    }

    /// Whether the model is an instance of `model_type`
    fn is_instance_of(&self, model_type: &ModelType) -> bool {
        self.view(model_type).is_some()
    }
}

impl fmt::Debug for dyn RequestModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestModel").field(&self.model_name()).finish()
    }
}

impl dyn RequestModel {
    /// Borrow the model as its concrete type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Implement [`RequestModel`] for a type
///
/// The plain form makes the type match only itself. The `views` form also
/// declares embedded types the model is an instance of.
///
/// # Example
///
/// ```rust,ignore
/// impl_request_model!(CreateUser);
///
/// // An AdminCreateUser is also a CreateUser
/// impl_request_model!(AdminCreateUser, views {
///     CreateUser => |admin| &admin.user,
/// });
/// ```
#[macro_export]
macro_rules! impl_request_model {
    ($type:ty) => {
        impl $crate::core::model::RequestModel for $type {
            fn as_any(&self) -> &(dyn ::std::any::Any + Send + Sync) {
                self
            }

            fn model_name(&self) -> &'static str {
                ::std::any::type_name::<$type>()
            }
        }
    };
    ($type:ty, views { $($view:ty => |$this:ident| $expr:expr),* $(,)? }) => {
        impl $crate::core::model::RequestModel for $type {
            fn as_any(&self) -> &(dyn ::std::any::Any + Send + Sync) {
                self
            }

            fn model_name(&self) -> &'static str {
                ::std::any::type_name::<$type>()
            }

            fn view(
                &self,
                model_type: &$crate::core::model::ModelType,
            ) -> Option<&(dyn ::std::any::Any + Send + Sync)> {
                if model_type.is::<$type>() {
                    return Some(self);
                }
                $(
                    if model_type.is::<$view>() {
                        let $this = self;
                        let view: &$view = $expr;
                        return Some(view);
                    }
                )*
                None
            }
        }
    };
}
