use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::AccessError;
use super::meta::Meta;
use super::{Base, Id, Instance, Model};

type Getter = Arc<dyn Fn(&dyn Instance) -> Result<Value, AccessError> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut dyn Instance, Value) -> Result<(), AccessError> + Send + Sync>;

/// Typed get/set closures for one declared field, built once during
/// declaration and erased behind `dyn Instance`.
#[derive(Clone)]
pub(crate) struct Accessor {
    get: Getter,
    set: Setter,
}

impl Accessor {
    pub(crate) fn typed<M, T>(name: &str, get: fn(&M) -> &T, get_mut: fn(&mut M) -> &mut T) -> Self
    where
        M: Model,
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let get_name = name.to_string();
        let set_name = name.to_string();

        Self {
            get: Arc::new(move |instance: &dyn Instance| -> Result<Value, AccessError> {
                let model = downcast::<M>(instance, &get_name)?;
                serde_json::to_value(get(model)).map_err(|e| AccessError::TypeMismatch {
                    field: get_name.clone(),
                    reason: e.to_string(),
                })
            }),
            set: Arc::new(move |instance: &mut dyn Instance, value: Value| -> Result<(), AccessError> {
                let model = downcast_mut::<M>(instance, &set_name)?;
                let typed: T = serde_json::from_value(value).map_err(|e| AccessError::TypeMismatch {
                    field: set_name.clone(),
                    reason: e.to_string(),
                })?;
                *get_mut(model) = typed;
                Ok(())
            }),
        }
    }

    pub(crate) fn get(&self, instance: &dyn Instance) -> Result<Value, AccessError> {
        (self.get)(instance)
    }

    pub(crate) fn set(&self, instance: &mut dyn Instance, value: Value) -> Result<(), AccessError> {
        (self.set)(instance, value)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor")
    }
}

/// Accessor for the id held by the embedded `Base`.
#[derive(Clone)]
pub(crate) struct IdAccessor {
    get: Arc<dyn Fn(&dyn Instance) -> Result<Id, AccessError> + Send + Sync>,
    set: Arc<dyn Fn(&mut dyn Instance, Id) -> Result<(), AccessError> + Send + Sync>,
}

impl IdAccessor {
    pub(crate) fn typed<M: Model>(get: fn(&M) -> &Base, get_mut: fn(&mut M) -> &mut Base) -> Self {
        Self {
            get: Arc::new(move |instance: &dyn Instance| -> Result<Id, AccessError> {
                downcast::<M>(instance, "id").map(|model| get(model).id)
            }),
            set: Arc::new(move |instance: &mut dyn Instance, id: Id| -> Result<(), AccessError> {
                let model = downcast_mut::<M>(instance, "id")?;
                get_mut(model).id = id;
                Ok(())
            }),
        }
    }
}

impl fmt::Debug for IdAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdAccessor")
    }
}

fn downcast<'a, M: Model>(instance: &'a dyn Instance, field: &str) -> Result<&'a M, AccessError> {
    let found = instance.type_name();
    instance
        .as_any()
        .downcast_ref::<M>()
        .ok_or_else(|| AccessError::TypeMismatch {
            field: field.to_string(),
            reason: format!("expected {}, got {}", std::any::type_name::<M>(), found),
        })
}

fn downcast_mut<'a, M: Model>(
    instance: &'a mut dyn Instance,
    field: &str,
) -> Result<&'a mut M, AccessError> {
    let found = instance.type_name();
    instance
        .as_any_mut()
        .downcast_mut::<M>()
        .ok_or_else(|| AccessError::TypeMismatch {
            field: field.to_string(),
            reason: format!("expected {}, got {}", std::any::type_name::<M>(), found),
        })
}

impl Meta {
    /// Read a field by external name, storage name or declared name. The
    /// first field in declaration order that matches any of the three wins.
    pub fn get(&self, model: &dyn Instance, name: &str) -> Result<Value, AccessError> {
        let accessor = self.accessor(name)?;
        accessor.get(model)
    }

    /// Write a field, looked up the same way as `get`.
    pub fn set(&self, model: &mut dyn Instance, name: &str, value: Value) -> Result<(), AccessError> {
        let accessor = self.accessor(name)?;
        accessor.set(model, value)
    }

    pub fn id(&self, model: &dyn Instance) -> Result<Id, AccessError> {
        (self.id.get)(model)
    }

    pub fn set_id(&self, model: &mut dyn Instance, id: Id) -> Result<(), AccessError> {
        (self.id.set)(model, id)
    }

    /// Assign a fresh id when the model has none yet and return the id.
    pub fn ensure_id(&self, model: &mut dyn Instance) -> Result<Id, AccessError> {
        let current = self.id(model)?;
        if !current.is_nil() {
            return Ok(current);
        }
        let fresh = Id::new();
        self.set_id(model, fresh)?;
        Ok(fresh)
    }

    fn accessor(&self, name: &str) -> Result<&Accessor, AccessError> {
        self.fields
            .iter()
            .filter(|f| f.name == name || f.json_name == name || f.bson_name == name)
            .find_map(|f| f.accessor.as_ref())
            .ok_or_else(|| AccessError::FieldNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::model::{get_meta, AccessError, Base, Declaration, Id, Instance, Model};

    #[derive(Debug, Clone, Default)]
    struct Note {
        base: Base,
        title: String,
        count: i64,
        tags: Vec<String>,
    }

    impl Model for Note {
        fn declare(m: &mut Declaration<Self>) {
            m.base(r#"fire:"note:notes""#, |n| &n.base, |n| &mut n.base);
            m.field("Title", r#"json:"title" bson:"headline""#, |n| &n.title, |n| &mut n.title);
            m.field("Count", "", |n| &n.count, |n| &mut n.count);
            m.field("Tags", r#"json:"tags""#, |n| &n.tags, |n| &mut n.tags);
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Other {
        base: Base,
    }

    impl Model for Other {
        fn declare(m: &mut Declaration<Self>) {
            m.base(r#"fire:"other:others""#, |o| &o.base, |o| &mut o.base);
        }
    }

    #[test]
    fn get_matches_any_alias() {
        let meta = get_meta::<Note>();
        let note = Note {
            title: "Hello".into(),
            ..Default::default()
        };

        assert_eq!(meta.get(&note, "title").unwrap(), json!("Hello"));
        assert_eq!(meta.get(&note, "headline").unwrap(), json!("Hello"));
        assert_eq!(meta.get(&note, "Title").unwrap(), json!("Hello"));
        assert_eq!(meta.get(&note, "count").unwrap(), json!(0));
    }

    #[test]
    fn set_writes_in_place() {
        let meta = get_meta::<Note>();
        let mut note = Note::default();

        meta.set(&mut note, "title", json!("Changed")).unwrap();
        meta.set(&mut note, "tags", json!(["a", "b"])).unwrap();

        assert_eq!(note.title, "Changed");
        assert_eq!(note.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unknown_field_is_reported() {
        let meta = get_meta::<Note>();
        let mut note = Note::default();

        assert_eq!(
            meta.get(&note, "missing"),
            Err(AccessError::FieldNotFound("missing".into()))
        );
        assert!(matches!(
            meta.set(&mut note, "missing", json!(1)),
            Err(AccessError::FieldNotFound(_))
        ));
    }

    #[test]
    fn mismatched_value_is_reported() {
        let meta = get_meta::<Note>();
        let mut note = Note::default();

        let err = meta.set(&mut note, "count", json!("ten")).unwrap_err();
        assert!(matches!(err, AccessError::TypeMismatch { .. }));
        assert_eq!(note.count, 0);
    }

    #[test]
    fn wrong_instance_type_is_a_mismatch() {
        let meta = get_meta::<Note>();
        let other = Other::default();
        assert!(matches!(
            meta.get(&other, "title"),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn ensure_id_assigns_once() {
        let meta = get_meta::<Note>();
        let mut note = Note::default();
        assert!(meta.id(&note).unwrap().is_nil());

        let first = meta.ensure_id(&mut note).unwrap();
        let second = meta.ensure_id(&mut note).unwrap();
        assert!(!first.is_nil());
        assert_eq!(first, second);
        assert_eq!(note.base.id, first);

        let fixed = Id::new();
        let boxed: &mut dyn Instance = &mut note;
        meta.set_id(boxed, fixed).unwrap();
        assert_eq!(note.base.id, fixed);
    }
}
