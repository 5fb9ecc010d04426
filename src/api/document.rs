// Request documents: parsing and applying them to model instances.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::relationships::set_linkage;
use crate::error::ApiError;
use crate::model::{AccessError, Id, Instance, Meta};

/// The `data` member of a create or update request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: ResourceBody,
}

impl ResourceBody {
    /// Parse `{"data": {...}}`, checking the type against the plural name.
    pub fn parse(bytes: &[u8], meta: &Meta) -> Result<Self, ApiError> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| ApiError::bad_request(format!("Invalid request document: {}", e)))?;
        let body = envelope.data;
        if body.kind != meta.plural {
            return Err(ApiError::bad_request(format!(
                "Resource type '{}' does not match '{}'",
                body.kind, meta.plural
            )));
        }
        Ok(body)
    }

    /// The supplied id, if any. Empty counts as absent.
    pub fn parsed_id(&self) -> Result<Option<Id>, ApiError> {
        match self.id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Id::parse(raw)
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("Invalid id '{}'", raw))),
        }
    }

    /// Write attributes and relationships onto `model`. Attributes the model
    /// does not declare are ignored.
    pub fn apply(&self, meta: &Meta, model: &mut dyn Instance) -> Result<(), ApiError> {
        for (name, value) in &self.attributes {
            let Some(field) = meta.attribute(name) else {
                tracing::debug!(model = meta.model, attribute = %name, "Ignoring unknown attribute");
                continue;
            };
            meta.set(model, &field.name, value.clone()).map_err(|e| match e {
                AccessError::TypeMismatch { .. } => {
                    ApiError::bad_request(format!("Invalid value for attribute '{}'", name))
                }
                other => ApiError::internal(other),
            })?;
        }

        for (name, member) in &self.relationships {
            let Some(field) = meta.relationship(name) else {
                tracing::debug!(model = meta.model, relationship = %name, "Ignoring unknown relationship");
                continue;
            };
            let data = linkage_member(member)?;
            set_linkage(meta, field, model, data)?;
        }

        Ok(())
    }
}

fn linkage_member(document: &Value) -> Result<&Value, ApiError> {
    document
        .as_object()
        .and_then(|o| o.get("data"))
        .ok_or_else(|| ApiError::bad_request("Relationship document requires a data member"))
}

/// Parse a relationship request body and return its `data` member.
pub fn parse_linkage(bytes: &[u8]) -> Result<Value, ApiError> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| ApiError::bad_request(format!("Invalid request document: {}", e)))?;
    linkage_member(&document).cloned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{get_meta, Base, Declaration, Model};

    #[derive(Debug, Clone, Default)]
    struct Memo {
        base: Base,
        subject: String,
        priority: i64,
        owner: Option<Id>,
    }

    impl Model for Memo {
        fn declare(m: &mut Declaration<Self>) {
            m.base(r#"fire:"memo:memos""#, |x| &x.base, |x| &mut x.base);
            m.field("Subject", r#"json:"subject""#, |x| &x.subject, |x| &mut x.subject);
            m.field("Priority", r#"json:"priority""#, |x| &x.priority, |x| &mut x.priority);
            m.field("Owner", r#"fire:"owner:users""#, |x| &x.owner, |x| &mut x.owner);
        }
    }

    #[test]
    fn parses_and_applies_a_resource() {
        let meta = get_meta::<Memo>();
        let owner = Id::new();
        let raw = json!({"data": {
            "type": "memos",
            "attributes": {"subject": "Hi", "priority": 2, "unknown": true},
            "relationships": {"owner": {"data": {"type": "users", "id": owner.to_string()}}}
        }});

        let body = ResourceBody::parse(raw.to_string().as_bytes(), &meta).unwrap();
        assert_eq!(body.parsed_id().unwrap(), None);

        let mut memo = Memo::default();
        body.apply(&meta, &mut memo).unwrap();
        assert_eq!(memo.subject, "Hi");
        assert_eq!(memo.priority, 2);
        assert_eq!(memo.owner, Some(owner));
    }

    #[test]
    fn rejects_bad_documents() {
        let meta = get_meta::<Memo>();
        assert!(ResourceBody::parse(b"not json", &meta).is_err());
        assert!(ResourceBody::parse(br#"{"data": {"type": "posts"}}"#, &meta).is_err());
        assert!(ResourceBody::parse(br#"{"type": "memos"}"#, &meta).is_err());

        let body = ResourceBody::parse(br#"{"data": {"type": "memos", "id": "zzz"}}"#, &meta).unwrap();
        assert_eq!(body.parsed_id().unwrap_err().status_code(), 400);

        let body =
            ResourceBody::parse(br#"{"data": {"type": "memos", "attributes": {"priority": "high"}}}"#, &meta)
                .unwrap();
        let err = body.apply(&meta, &mut Memo::default()).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn linkage_requires_data_member() {
        assert_eq!(parse_linkage(br#"{"data": null}"#).unwrap(), Value::Null);
        assert!(parse_linkage(br#"{"links": {}}"#).is_err());
    }
}
