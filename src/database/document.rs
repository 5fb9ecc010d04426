// Mapping between model instances and stored documents.

use serde_json::Value;

use super::store::{document_id, Document, StoreError};
use crate::model::{Instance, Meta};

/// Encode every stored field under its storage name, plus `_id`.
pub fn encode(meta: &Meta, model: &dyn Instance) -> Result<Document, StoreError> {
    let codec = |e: crate::model::AccessError| StoreError::Codec(e.to_string());

    let mut document = Document::new();
    document.insert("_id".to_string(), Value::String(meta.id(model).map_err(codec)?.to_string()));

    for field in meta.fields.iter().filter(|f| f.is_stored()) {
        let value = meta.get(model, &field.name).map_err(codec)?;
        document.insert(field.bson_name.clone(), value);
    }

    Ok(document)
}

/// Build an instance from a stored document. Fields missing from the
/// document keep their zero value.
pub fn decode(meta: &Meta, document: &Document) -> Result<Box<dyn Instance>, StoreError> {
    let codec = |e: crate::model::AccessError| StoreError::Codec(e.to_string());

    let mut model = meta.new_instance();
    meta.set_id(model.as_mut(), document_id(document)?).map_err(codec)?;

    for field in meta.fields.iter().filter(|f| f.is_stored()) {
        if let Some(value) = document.get(&field.bson_name) {
            meta.set(model.as_mut(), &field.name, value.clone()).map_err(codec)?;
        }
    }

    Ok(model)
}

pub fn decode_all(meta: &Meta, documents: &[Document]) -> Result<Vec<Box<dyn Instance>>, StoreError> {
    documents.iter().map(|d| decode(meta, d)).collect()
}
