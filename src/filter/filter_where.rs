use std::collections::HashMap;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::Condition;
use crate::model::{Field, Id, Meta, RelationKind, ValueKind};

pub struct FilterWhere;

impl FilterWhere {
    /// Conditions from `filter[<field>]=a,b` and `<relationship>-id=<id>`
    /// parameters. Keys naming no filterable field are ignored.
    pub fn parse(meta: &Meta, params: &HashMap<String, String>) -> Result<Vec<Condition>, FilterError> {
        let mut conditions = Vec::new();

        for (key, raw) in params {
            if let Some(name) = key.strip_prefix("filter[").and_then(|k| k.strip_suffix(']')) {
                let Some(field) = meta.field(name).filter(|f| f.filterable && f.is_stored()) else {
                    tracing::debug!(model = meta.model, filter = %name, "Ignoring unknown filter");
                    continue;
                };
                let values = raw
                    .split(',')
                    .map(|v| Self::coerce(field, v.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
                conditions.push(Condition {
                    field: field.bson_name.clone(),
                    values,
                });
            } else if let Some(name) = key.strip_suffix("-id") {
                let Some(field) = meta
                    .relationship(name)
                    .filter(|f| matches!(f.relation, RelationKind::ToOne | RelationKind::ToMany))
                else {
                    continue;
                };
                let id = Id::parse(raw).map_err(|_| FilterError::InvalidId {
                    relationship: name.to_string(),
                    value: raw.clone(),
                })?;
                conditions.push(Condition {
                    field: field.bson_name.clone(),
                    values: vec![Value::String(id.to_string())],
                });
            }
        }

        Ok(conditions)
    }

    /// Turn a query string value into the JSON kind the field stores.
    fn coerce(field: &Field, raw: &str) -> Result<Value, FilterError> {
        let invalid = || FilterError::InvalidValue {
            field: field.json_name.clone(),
            value: raw.to_string(),
        };

        match field.kind {
            ValueKind::Number => {
                if let Ok(i) = raw.parse::<i64>() {
                    Ok(Value::from(i))
                } else {
                    raw.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .ok_or_else(invalid)
                }
            }
            ValueKind::Bool => raw.parse::<bool>().map(Value::Bool).map_err(|_| invalid()),
            _ => Ok(Value::String(raw.to_string())),
        }
    }

    /// True when the document satisfies every condition.
    pub fn matches(document: &Map<String, Value>, conditions: &[Condition]) -> bool {
        conditions.iter().all(|condition| {
            let stored = document.get(&condition.field).unwrap_or(&Value::Null);
            condition.values.iter().any(|wanted| match stored {
                Value::Array(items) => items.iter().any(|item| values_equal(item, wanted)),
                other => values_equal(other, wanted),
            })
        })
    }
}

/// Fields whose zero value is `null` (`Option<i64>`, `Option<bool>`) keep
/// their query values as text, so scalars are also compared by their text.
fn values_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(x), Value::String(text)) => {
            text.parse::<f64>().ok().is_some_and(|y| x.as_f64() == Some(y))
        }
        (Value::Bool(x), Value::String(text)) => text.parse::<bool>().ok() == Some(*x),
        _ => stored == wanted,
    }
}
