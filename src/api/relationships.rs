// Relationship resolution: linkage read from an instance, linkage written
// back from JSON:API resource identifiers, and the links for each relation.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::model::{AccessError, Field, Id, Instance, Meta, RelationKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelationError {
    #[error("invalid id {0:?}")]
    InvalidId(String),

    #[error("invalid linkage for relationship '{relationship}': {reason}")]
    InvalidLinkage { relationship: String, reason: String },

    #[error("relationship '{relationship}' expects type '{expected}', got '{found}'")]
    TypeMismatch {
        relationship: String,
        expected: String,
        found: String,
    },

    #[error("relationship '{0}' is read-only")]
    ReadOnly(String),

    #[error("relationship '{0}' is not a to-many relationship")]
    NotToMany(String),

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Ids referenced by a to-one or to-many field, in stored order. Unset
/// optional references and has-many relations yield nothing.
pub fn linked_ids(meta: &Meta, field: &Field, model: &dyn Instance) -> Result<Vec<Id>, AccessError> {
    let parse = |raw: &str| -> Result<Option<Id>, AccessError> {
        if raw.is_empty() {
            return Ok(None);
        }
        Id::parse(raw).map(Some).map_err(|e| AccessError::TypeMismatch {
            field: field.name.clone(),
            reason: e.to_string(),
        })
    };

    match field.relation {
        RelationKind::ToOne | RelationKind::ToMany => {}
        RelationKind::None | RelationKind::HasMany => return Ok(Vec::new()),
    }

    let mut ids = Vec::new();
    match meta.get(model, &field.name)? {
        Value::String(raw) => ids.extend(parse(&raw)?),
        Value::Array(items) => {
            for item in items {
                if let Some(raw) = item.as_str() {
                    ids.extend(parse(raw)?);
                }
            }
        }
        _ => {}
    }
    Ok(ids)
}

/// `{"type": .., "id": ..}`
pub fn identifier(kind: &str, id: Id) -> Value {
    json!({ "type": kind, "id": id.to_string() })
}

/// The `data` member for a to-one or to-many relationship.
pub fn linkage(meta: &Meta, field: &Field, model: &dyn Instance) -> Result<Value, AccessError> {
    let ids = linked_ids(meta, field, model)?;
    Ok(match field.relation {
        RelationKind::ToOne => ids
            .first()
            .map(|id| identifier(&field.rel_type, *id))
            .unwrap_or(Value::Null),
        _ => Value::Array(ids.iter().map(|id| identifier(&field.rel_type, *id)).collect()),
    })
}

pub fn links(prefix: &str, plural: &str, id: Id, relationship: &str) -> Value {
    json!({
        "self": format!("{}/{}/{}/relationships/{}", prefix, plural, id, relationship),
        "related": format!("{}/{}/{}/{}", prefix, plural, id, relationship),
    })
}

/// The `relationships` member of a resource object. Has-many relations only
/// carry links; their members are found by querying the target collection.
pub fn relationships_object(
    prefix: &str,
    meta: &Meta,
    model: &dyn Instance,
) -> Result<Map<String, Value>, AccessError> {
    let id = meta.id(model)?;
    let mut out = Map::new();

    for field in meta.relationships() {
        let mut entry = Map::new();
        if field.relation != RelationKind::HasMany {
            entry.insert("data".into(), linkage(meta, field, model)?);
        }
        entry.insert("links".into(), links(prefix, &meta.plural, id, &field.rel_name));
        out.insert(field.rel_name.clone(), Value::Object(entry));
    }

    Ok(out)
}

/// Parse one resource identifier, checking the target type.
pub fn parse_identifier(field: &Field, value: &Value) -> Result<Id, RelationError> {
    let invalid = |reason: &str| RelationError::InvalidLinkage {
        relationship: field.rel_name.clone(),
        reason: reason.to_string(),
    };

    let object = value.as_object().ok_or_else(|| invalid("expected a resource identifier object"))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing type"))?;
    if kind != field.rel_type {
        return Err(RelationError::TypeMismatch {
            relationship: field.rel_name.clone(),
            expected: field.rel_type.clone(),
            found: kind.to_string(),
        });
    }

    let raw = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing id"))?;
    Id::parse(raw).map_err(|_| RelationError::InvalidId(raw.to_string()))
}

fn parse_identifiers(field: &Field, data: &Value) -> Result<Vec<Id>, RelationError> {
    let items = data.as_array().ok_or_else(|| RelationError::InvalidLinkage {
        relationship: field.rel_name.clone(),
        reason: "expected an array of resource identifiers".to_string(),
    })?;
    items.iter().map(|item| parse_identifier(field, item)).collect()
}

fn store_ids(meta: &Meta, field: &Field, model: &mut dyn Instance, ids: &[Id]) -> Result<(), RelationError> {
    let value = Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect());
    meta.set(model, &field.name, value)?;
    Ok(())
}

/// Replace the linkage with `data`: `null` or an identifier for to-one, an
/// array of identifiers for to-many. A `null` on a required to-one clears
/// the reference and is caught by structural validation.
pub fn set_linkage(meta: &Meta, field: &Field, model: &mut dyn Instance, data: &Value) -> Result<(), RelationError> {
    match field.relation {
        RelationKind::ToOne => {
            let value = match data {
                Value::Null if field.optional => Value::Null,
                Value::Null => Value::String(String::new()),
                other => Value::String(parse_identifier(field, other)?.to_string()),
            };
            meta.set(model, &field.name, value)?;
            Ok(())
        }
        RelationKind::ToMany => {
            let ids = parse_identifiers(field, data)?;
            store_ids(meta, field, model, &ids)
        }
        RelationKind::HasMany | RelationKind::None => Err(RelationError::ReadOnly(field.rel_name.clone())),
    }
}

/// Append identifiers not already present to a to-many linkage.
pub fn add_linkage(meta: &Meta, field: &Field, model: &mut dyn Instance, data: &Value) -> Result<(), RelationError> {
    match field.relation {
        RelationKind::ToMany => {}
        RelationKind::HasMany => return Err(RelationError::ReadOnly(field.rel_name.clone())),
        _ => return Err(RelationError::NotToMany(field.rel_name.clone())),
    }

    let mut ids = linked_ids(meta, field, model)?;
    for id in parse_identifiers(field, data)? {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    store_ids(meta, field, model, &ids)
}

/// Drop the given identifiers from a to-many linkage.
pub fn remove_linkage(meta: &Meta, field: &Field, model: &mut dyn Instance, data: &Value) -> Result<(), RelationError> {
    match field.relation {
        RelationKind::ToMany => {}
        RelationKind::HasMany => return Err(RelationError::ReadOnly(field.rel_name.clone())),
        _ => return Err(RelationError::NotToMany(field.rel_name.clone())),
    }

    let removed = parse_identifiers(field, data)?;
    let ids: Vec<Id> = linked_ids(meta, field, model)?
        .into_iter()
        .filter(|id| !removed.contains(id))
        .collect();
    store_ids(meta, field, model, &ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{get_meta, Base, Declaration, Model};

    #[derive(Debug, Clone, Default)]
    struct Task {
        base: Base,
        project: Id,
        assignee: Option<Id>,
        watchers: Vec<Id>,
    }

    impl Model for Task {
        fn declare(m: &mut Declaration<Self>) {
            m.base(r#"fire:"task:tasks""#, |t| &t.base, |t| &mut t.base);
            m.field("Project", r#"fire:"project:projects""#, |t| &t.project, |t| &mut t.project);
            m.field("Assignee", r#"fire:"assignee:users""#, |t| &t.assignee, |t| &mut t.assignee);
            m.field("Watchers", r#"fire:"watchers:users""#, |t| &t.watchers, |t| &mut t.watchers);
            m.has_many("Notes", r#"fire:"notes:notes:task""#);
        }
    }

    fn rel<'a>(meta: &'a Meta, name: &str) -> &'a Field {
        meta.relationship(name).unwrap()
    }

    #[test]
    fn resolves_linkage_per_kind() {
        let meta = get_meta::<Task>();
        let (project, user) = (Id::new(), Id::new());
        let task = Task {
            base: Base { id: Id::new() },
            project,
            assignee: None,
            watchers: vec![user, project],
        };

        assert_eq!(linkage(&meta, rel(&meta, "project"), &task).unwrap(), identifier("projects", project));
        assert_eq!(linkage(&meta, rel(&meta, "assignee"), &task).unwrap(), Value::Null);
        assert_eq!(
            linked_ids(&meta, rel(&meta, "watchers"), &task).unwrap(),
            vec![user, project]
        );
        assert!(linked_ids(&meta, rel(&meta, "notes"), &task).unwrap().is_empty());
    }

    #[test]
    fn relationships_object_has_links_only_for_has_many() {
        let meta = get_meta::<Task>();
        let task = Task {
            base: Base { id: Id::new() },
            ..Default::default()
        };

        let rels = relationships_object("/api", &meta, &task).unwrap();
        assert_eq!(rels.len(), 4);
        assert_eq!(rels["watchers"]["data"], json!([]));
        assert!(rels["notes"].get("data").is_none());
        assert_eq!(
            rels["notes"]["links"]["related"],
            json!(format!("/api/tasks/{}/notes", task.base.id))
        );
        assert_eq!(
            rels["notes"]["links"]["self"],
            json!(format!("/api/tasks/{}/relationships/notes", task.base.id))
        );
    }

    #[test]
    fn set_linkage_validates_identifiers() {
        let meta = get_meta::<Task>();
        let mut task = Task::default();
        let user = Id::new();

        set_linkage(&meta, rel(&meta, "assignee"), &mut task, &identifier("users", user)).unwrap();
        assert_eq!(task.assignee, Some(user));

        set_linkage(&meta, rel(&meta, "assignee"), &mut task, &Value::Null).unwrap();
        assert_eq!(task.assignee, None);

        let bad_id = json!({"type": "users", "id": "nope"});
        assert_eq!(
            set_linkage(&meta, rel(&meta, "assignee"), &mut task, &bad_id),
            Err(RelationError::InvalidId("nope".into()))
        );

        let wrong_type = identifier("projects", user);
        assert!(matches!(
            set_linkage(&meta, rel(&meta, "assignee"), &mut task, &wrong_type),
            Err(RelationError::TypeMismatch { .. })
        ));

        assert!(matches!(
            set_linkage(&meta, rel(&meta, "notes"), &mut task, &json!([])),
            Err(RelationError::ReadOnly(_))
        ));
    }

    #[test]
    fn clearing_required_to_one_leaves_nil() {
        let meta = get_meta::<Task>();
        let mut task = Task {
            project: Id::new(),
            ..Default::default()
        };
        set_linkage(&meta, rel(&meta, "project"), &mut task, &Value::Null).unwrap();
        assert!(task.project.is_nil());
    }

    #[test]
    fn add_and_remove_to_many_members() {
        let meta = get_meta::<Task>();
        let (a, b, c) = (Id::new(), Id::new(), Id::new());
        let mut task = Task {
            watchers: vec![a],
            ..Default::default()
        };
        let watchers = rel(&meta, "watchers");

        add_linkage(&meta, watchers, &mut task, &json!([identifier("users", a), identifier("users", b)])).unwrap();
        add_linkage(&meta, watchers, &mut task, &json!([identifier("users", c)])).unwrap();
        assert_eq!(task.watchers, vec![a, b, c]);

        remove_linkage(&meta, watchers, &mut task, &json!([identifier("users", b)])).unwrap();
        assert_eq!(task.watchers, vec![a, c]);

        assert!(matches!(
            add_linkage(&meta, rel(&meta, "project"), &mut task, &json!([])),
            Err(RelationError::NotToMany(_))
        ));
    }
}
