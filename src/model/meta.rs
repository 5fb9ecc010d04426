use std::collections::HashSet;

use serde_json::Value;

use super::access::{Accessor, IdAccessor};
use super::declaration::{Declaration, Entry, Shape};
use super::error::MetaError;
use super::tags::StructTag;
use super::{Instance, Model};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    None,
    ToOne,
    ToMany,
    HasMany,
}

/// JSON kind of a field's zero value; used to coerce query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Bool,
    Array,
    Object,
    Unknown,
}

impl ValueKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Bool,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Null => ValueKind::Unknown,
        }
    }
}

/// Canonical description of one declared field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub json_name: String,
    pub bson_name: String,
    pub optional: bool,
    pub required: bool,
    pub relation: RelationKind,
    pub rel_name: String,
    pub rel_type: String,
    pub rel_inverse: String,
    pub filterable: bool,
    pub sortable: bool,
    pub kind: ValueKind,
    pub(crate) accessor: Option<Accessor>,
}

impl Field {
    /// Plain fields exposed under `attributes`.
    pub fn is_attribute(&self) -> bool {
        self.relation == RelationKind::None && self.json_name != "-"
    }

    pub fn is_relationship(&self) -> bool {
        self.relation != RelationKind::None
    }

    /// Has-many fields are virtual and never persisted.
    pub fn is_stored(&self) -> bool {
        self.accessor.is_some()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.json_name == other.json_name
            && self.bson_name == other.bson_name
            && self.optional == other.optional
            && self.required == other.required
            && self.relation == other.relation
            && self.rel_name == other.rel_name
            && self.rel_type == other.rel_type
            && self.rel_inverse == other.rel_inverse
            && self.filterable == other.filterable
            && self.sortable == other.sortable
            && self.kind == other.kind
    }
}

/// Metadata derived once per model type.
#[derive(Debug, Clone)]
pub struct Meta {
    pub model: &'static str,
    pub singular: String,
    pub plural: String,
    pub collection: String,
    pub fields: Vec<Field>,
    pub(crate) id: IdAccessor,
    factory: fn() -> Box<dyn Instance>,
}

impl PartialEq for Meta {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.singular == other.singular
            && self.plural == other.plural
            && self.collection == other.collection
            && self.fields == other.fields
    }
}

fn new_instance<M: Model>() -> Box<dyn Instance> {
    Box::new(M::default())
}

impl Meta {
    /// Run `M::declare` and validate the result. Prefer `get_meta`, which
    /// caches; this always derives from scratch.
    pub fn derive<M: Model>() -> Result<Self, MetaError> {
        let model = std::any::type_name::<M>();
        let mut declaration = Declaration::<M>::new();
        M::declare(&mut declaration);

        let Declaration { bases, entries, .. } = declaration;

        let base = match bases.len() {
            0 => return Err(MetaError::MissingBase { model }),
            1 => bases.into_iter().next().ok_or(MetaError::MissingBase { model })?,
            _ => return Err(MetaError::DuplicateBase { model }),
        };

        let (singular, plural, collection) = parse_base_tag(model, &base.tag)?;

        let mut fields = Vec::with_capacity(entries.len());
        for entry in entries {
            fields.push(derive_field(model, entry)?);
        }

        check_unique_names(model, &fields)?;

        Ok(Self {
            model,
            singular,
            plural,
            collection,
            fields,
            id: base.id,
            factory: new_instance::<M>,
        })
    }

    pub fn new_instance(&self) -> Box<dyn Instance> {
        (self.factory)()
    }

    /// First field matching by external, storage or declared name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.json_name == name || f.bson_name == name || f.name == name)
    }

    pub fn attribute(&self, json_name: &str) -> Option<&Field> {
        self.attributes().find(|f| f.json_name == json_name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_attribute())
    }

    pub fn relationship(&self, name: &str) -> Option<&Field> {
        self.relationships().find(|f| f.rel_name == name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relationship())
    }
}

fn parse_base_tag(model: &'static str, tag: &str) -> Result<(String, String, String), MetaError> {
    let invalid = || MetaError::InvalidBaseTag {
        model,
        tag: tag.to_string(),
    };

    let parsed = StructTag::parse(tag).map_err(|_| MetaError::MalformedTag {
        model,
        field: "Base".to_string(),
        tag: tag.to_string(),
    })?;

    let value = parsed.get("fire").ok_or_else(invalid)?;
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    match parts.as_slice() {
        [singular, plural] => Ok((singular.to_string(), plural.to_string(), plural.to_string())),
        [singular, plural, collection] => Ok((
            singular.to_string(),
            plural.to_string(),
            collection.to_string(),
        )),
        _ => Err(invalid()),
    }
}

fn derive_field(model: &'static str, entry: Entry) -> Result<Field, MetaError> {
    match entry {
        Entry::Field {
            name,
            tag,
            shape,
            zero,
            accessor,
        } => derive_stored_field(model, name, tag, shape, zero, accessor),
        Entry::HasMany { name, tag } => derive_has_many(model, name, tag),
    }
}

fn derive_stored_field(
    model: &'static str,
    name: String,
    tag: String,
    shape: Shape,
    zero: Value,
    accessor: Accessor,
) -> Result<Field, MetaError> {
    let parsed = StructTag::parse(&tag).map_err(|_| MetaError::MalformedTag {
        model,
        field: name.clone(),
        tag: tag.clone(),
    })?;

    let unsupported = |item: &str| MetaError::UnsupportedTag {
        model,
        field: name.clone(),
        tag: item.to_string(),
    };

    let mut required = false;
    for item in parsed.items("valid") {
        match item {
            "required" => required = true,
            other => return Err(unsupported(other)),
        }
    }

    let mut filterable = false;
    let mut sortable = false;
    let mut relation_tag: Option<&str> = None;
    for item in parsed.items("fire") {
        match item {
            "filterable" => filterable = true,
            "sortable" => sortable = true,
            declared if declared.contains(':') => {
                if relation_tag.replace(declared).is_some() {
                    return Err(MetaError::DuplicateRelationship {
                        model,
                        field: name.clone(),
                    });
                }
            }
            other => return Err(unsupported(other)),
        }
    }

    let json_name = parsed.name("json").unwrap_or(&name).to_string();
    let bson_name = parsed
        .name("bson")
        .map(str::to_string)
        .unwrap_or_else(|| name.to_lowercase());

    let mut field = Field {
        json_name,
        bson_name,
        optional: !required,
        required,
        relation: RelationKind::None,
        rel_name: String::new(),
        rel_type: String::new(),
        rel_inverse: String::new(),
        filterable,
        sortable,
        kind: ValueKind::of(&zero),
        accessor: Some(accessor),
        name,
    };

    let Some(declared) = relation_tag else {
        return Ok(field);
    };

    if shape == Shape::Plain {
        return Err(MetaError::RelationshipType {
            model,
            field: field.name,
        });
    }

    let parts = relation_parts(declared);
    let [rel_name, rel_type] = parts.as_slice() else {
        return Err(MetaError::RelationshipArity {
            model,
            field: field.name,
            tag: declared.to_string(),
            expected: 2,
        });
    };

    field.rel_name = rel_name.to_string();
    field.rel_type = rel_type.to_string();
    match shape {
        Shape::Id => {
            field.relation = RelationKind::ToOne;
            field.optional = false;
            field.required = true;
        }
        Shape::OptionalId => {
            field.relation = RelationKind::ToOne;
            field.optional = true;
            field.required = false;
        }
        Shape::IdList => {
            field.relation = RelationKind::ToMany;
            field.optional = true;
        }
        Shape::Plain => unreachable!("plain fields rejected above"),
    }

    Ok(field)
}

fn derive_has_many(model: &'static str, name: String, tag: String) -> Result<Field, MetaError> {
    let parsed = StructTag::parse(&tag).map_err(|_| MetaError::MalformedTag {
        model,
        field: name.clone(),
        tag: tag.clone(),
    })?;

    let items = parsed.items("fire");
    let [declared] = items.as_slice() else {
        return Err(MetaError::RelationshipArity {
            model,
            field: name,
            tag,
            expected: 3,
        });
    };

    let parts = relation_parts(declared);
    let [rel_name, rel_type, rel_inverse] = parts.as_slice() else {
        return Err(MetaError::RelationshipArity {
            model,
            field: name,
            tag: declared.to_string(),
            expected: 3,
        });
    };

    Ok(Field {
        json_name: name.clone(),
        bson_name: String::new(),
        optional: true,
        required: false,
        relation: RelationKind::HasMany,
        rel_name: rel_name.to_string(),
        rel_type: rel_type.to_string(),
        rel_inverse: rel_inverse.to_string(),
        filterable: false,
        sortable: false,
        kind: ValueKind::Array,
        accessor: None,
        name,
    })
}

/// Split `name:type[:inverse]`; any empty part makes the item unusable, which
/// is reported as an arity error by returning an empty list.
fn relation_parts(declared: &str) -> Vec<&str> {
    let parts: Vec<&str> = declared.split(':').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Vec::new();
    }
    parts
}

fn check_unique_names(model: &'static str, fields: &[Field]) -> Result<(), MetaError> {
    let duplicate = |name: &str| MetaError::DuplicateName {
        model,
        name: name.to_string(),
    };

    let mut external: HashSet<&str> = HashSet::from(["id", "type"]);
    let mut storage: HashSet<&str> = HashSet::from(["_id"]);
    let mut relations: HashSet<&str> = HashSet::new();

    for field in fields {
        if field.is_attribute() && !external.insert(field.json_name.as_str()) {
            return Err(duplicate(&field.json_name));
        }
        if field.is_stored() && !storage.insert(field.bson_name.as_str()) {
            return Err(duplicate(&field.bson_name));
        }
        if field.is_relationship() && !relations.insert(field.rel_name.as_str()) {
            return Err(duplicate(&field.rel_name));
        }
    }

    Ok(())
}
