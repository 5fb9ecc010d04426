// Model declarations and the metadata derived from them.
//
// A model is a plain struct that embeds one `Base` and describes its fields
// through `Model::declare`. The description is turned into a `Meta` exactly
// once per type (see `registry`), and everything downstream (storage codec,
// JSON:API serialization, controllers) works from that `Meta`.

pub mod access;
pub mod declaration;
pub mod error;
pub mod id;
pub mod meta;
pub mod registry;
pub mod tags;

use std::any::Any;

use serde::{Deserialize, Serialize};

pub use declaration::Declaration;
pub use error::{AccessError, MetaError};
pub use id::{Id, InvalidId};
pub use meta::{Field, Meta, RelationKind, ValueKind};
pub use registry::{get_meta, try_get_meta};

/// The base marker every model embeds exactly once. Its declaration tag names
/// the model: `fire:"singular:plural[:collection]"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub id: Id,
}

impl Base {
    pub fn id(&self) -> Id {
        self.id
    }
}

/// A declarable model type.
///
/// `declare` must not call `get_meta` itself; it runs while the registry is
/// being populated.
pub trait Model: Default + Clone + Send + Sync + 'static {
    fn declare(model: &mut Declaration<Self>);
}

/// Type-erased model instance as handled by controllers and callbacks.
pub trait Instance: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_instance(&self) -> Box<dyn Instance>;
    fn type_name(&self) -> &'static str;
}

impl<M: Model> Instance for M {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_instance(&self) -> Box<dyn Instance> {
        Box::new(self.clone())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }
}

impl dyn Instance {
    pub fn downcast_ref<M: Model>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }

    pub fn downcast_mut<M: Model>(&mut self) -> Option<&mut M> {
        self.as_any_mut().downcast_mut::<M>()
    }
}

impl Clone for Box<dyn Instance> {
    fn clone(&self) -> Self {
        (**self).clone_instance()
    }
}

impl std::fmt::Debug for dyn Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance<{}>", self.type_name())
    }
}
