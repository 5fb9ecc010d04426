use std::any::TypeId;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::access::{Accessor, IdAccessor};
use super::{Base, Id, Model};

/// Value shape of a declared field, detected from its Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Plain,
    Id,
    OptionalId,
    IdList,
}

impl Shape {
    fn of<T: 'static>() -> Self {
        let ty = TypeId::of::<T>();
        if ty == TypeId::of::<Id>() {
            Shape::Id
        } else if ty == TypeId::of::<Option<Id>>() {
            Shape::OptionalId
        } else if ty == TypeId::of::<Vec<Id>>() {
            Shape::IdList
        } else {
            Shape::Plain
        }
    }
}

pub(crate) struct BaseEntry {
    pub tag: String,
    pub id: IdAccessor,
}

pub(crate) enum Entry {
    Field {
        name: String,
        tag: String,
        shape: Shape,
        zero: Value,
        accessor: Accessor,
    },
    HasMany {
        name: String,
        tag: String,
    },
}

/// Builder populated by `Model::declare`. Nothing is validated here; all
/// checks happen when the declaration is turned into a `Meta`.
///
/// ```ignore
/// impl Model for Post {
///     fn declare(m: &mut Declaration<Self>) {
///         m.base(r#"fire:"post:posts""#, |p| &p.base, |p| &mut p.base);
///         m.field("Title", r#"json:"title" fire:"filterable,sortable""#, |p| &p.title, |p| &mut p.title);
///         m.has_many("Comments", r#"fire:"comments:comments:post""#);
///     }
/// }
/// ```
pub struct Declaration<M: Model> {
    pub(crate) bases: Vec<BaseEntry>,
    pub(crate) entries: Vec<Entry>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Declaration<M> {
    pub(crate) fn new() -> Self {
        Self {
            bases: Vec::new(),
            entries: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Declare the embedded base marker and the model's names.
    pub fn base(
        &mut self,
        tag: &str,
        get: fn(&M) -> &Base,
        get_mut: fn(&mut M) -> &mut Base,
    ) -> &mut Self {
        self.bases.push(BaseEntry {
            tag: tag.to_string(),
            id: IdAccessor::typed(get, get_mut),
        });
        self
    }

    /// Declare a stored field. Fields of type `Id`, `Option<Id>` and
    /// `Vec<Id>` become relationships when their tag carries a
    /// `fire:"name:type"` item.
    pub fn field<T>(
        &mut self,
        name: &str,
        tag: &str,
        get: fn(&M) -> &T,
        get_mut: fn(&mut M) -> &mut T,
    ) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let zero = serde_json::to_value(get(&M::default())).unwrap_or(Value::Null);
        self.entries.push(Entry::Field {
            name: name.to_string(),
            tag: tag.to_string(),
            shape: Shape::of::<T>(),
            zero,
            accessor: Accessor::typed(name, get, get_mut),
        });
        self
    }

    /// Declare a virtual has-many relationship: `fire:"name:type:foreignKey"`.
    pub fn has_many(&mut self, name: &str, tag: &str) -> &mut Self {
        self.entries.push(Entry::HasMany {
            name: name.to_string(),
            tag: tag.to_string(),
        });
        self
    }
}
