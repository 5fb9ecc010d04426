use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::types::{SortDirection, SortKey};
use crate::model::Meta;

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `sort=title,-created`. Only sortable fields are kept; the rest
    /// are dropped silently.
    pub fn parse(meta: &Meta, sort: &str) -> Vec<SortKey> {
        let mut out = Vec::new();
        for part in sort.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (name, direction) = SortDirection::from_token(trimmed);
            match meta.field(name).filter(|f| f.sortable && f.is_stored()) {
                Some(field) => out.push(SortKey {
                    field: field.bson_name.clone(),
                    direction,
                }),
                None => tracing::debug!(model = meta.model, sort = %name, "Ignoring unknown sort key"),
            }
        }
        out
    }

    /// Stable multi-key sort; ties keep their storage order.
    pub fn apply(documents: &mut [Map<String, Value>], keys: &[SortKey]) {
        if keys.is_empty() {
            return;
        }
        documents.sort_by(|a, b| Self::compare(a, b, keys));
    }

    fn compare(a: &Map<String, Value>, b: &Map<String, Value>, keys: &[SortKey]) -> Ordering {
        for key in keys {
            let left = a.get(&key.field).unwrap_or(&Value::Null);
            let right = b.get(&key.field).unwrap_or(&Value::Null);
            let ordering = match key.direction {
                SortDirection::Asc => compare_values(left, right),
                SortDirection::Desc => compare_values(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// null < bool < number < string; arrays and objects compare equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
