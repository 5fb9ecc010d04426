use serde_json::{json, Map, Value};

use super::relationships::relationships_object;
use crate::model::{AccessError, Instance, Meta};

/// Convert a model instance into a JSON:API resource object
/// { type, id, attributes, relationships, links }
///
/// `fields` restricts the attributes to the named external names; the
/// relationships are always included in full.
pub fn resource_object(
    prefix: &str,
    meta: &Meta,
    model: &dyn Instance,
    fields: Option<&[String]>,
) -> Result<Value, AccessError> {
    let id = meta.id(model)?;
    let attributes = build_attributes(meta, model, fields)?;
    let relationships = relationships_object(prefix, meta, model)?;

    let mut obj = Map::new();
    obj.insert("type".into(), Value::String(meta.plural.clone()));
    obj.insert("id".into(), Value::String(id.to_string()));
    obj.insert("attributes".into(), Value::Object(attributes));
    if !relationships.is_empty() {
        obj.insert("relationships".into(), Value::Object(relationships));
    }
    obj.insert(
        "links".into(),
        json!({ "self": format!("{}/{}/{}", prefix, meta.plural, id) }),
    );

    Ok(Value::Object(obj))
}

/// Convert a list of instances to resource objects
pub fn resource_objects(
    prefix: &str,
    meta: &Meta,
    models: &[Box<dyn Instance>],
    fields: Option<&[String]>,
) -> Result<Vec<Value>, AccessError> {
    models
        .iter()
        .map(|m| resource_object(prefix, meta, m.as_ref(), fields))
        .collect()
}

fn build_attributes(
    meta: &Meta,
    model: &dyn Instance,
    fields: Option<&[String]>,
) -> Result<Map<String, Value>, AccessError> {
    let mut attrs = Map::new();
    for field in meta.attributes() {
        if let Some(selected) = fields {
            if !selected.iter().any(|f| f == &field.json_name) {
                continue;
            }
        }
        attrs.insert(field.json_name.clone(), meta.get(model, &field.name)?);
    }
    Ok(attrs)
}
