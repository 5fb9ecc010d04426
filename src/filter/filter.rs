use std::collections::HashMap;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::Query;
use crate::model::Meta;

/// Everything a list request asks for through its query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub query: Query,
    /// `fields[<type>]` selections, keyed by resource type.
    pub fields: HashMap<String, Vec<String>>,
}

impl Filter {
    pub fn from_params(meta: &Meta, params: &HashMap<String, String>) -> Result<Self, FilterError> {
        let conditions = FilterWhere::parse(meta, params)?;
        let sort = params
            .get("sort")
            .map(|s| FilterOrder::parse(meta, s))
            .unwrap_or_default();

        Ok(Self {
            query: Query { conditions, sort },
            fields: Self::sparse_fields(params),
        })
    }

    /// `fields[posts]=title,text-body` style parameters.
    pub fn sparse_fields(params: &HashMap<String, String>) -> HashMap<String, Vec<String>> {
        params
            .iter()
            .filter_map(|(key, value)| {
                let kind = key.strip_prefix("fields[")?.strip_suffix(']')?;
                let names = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                Some((kind.to_string(), names))
            })
            .collect()
    }

    /// Attribute selection for one resource type, if the request restricted it.
    pub fn fields_for(&self, kind: &str) -> Option<&[String]> {
        self.fields.get(kind).map(Vec::as_slice)
    }
}
