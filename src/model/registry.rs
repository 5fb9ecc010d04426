use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::error::MetaError;
use super::meta::Meta;
use super::Model;

// Process-wide metadata cache keyed by model type.
static REGISTRY: Lazy<RwLock<HashMap<TypeId, Arc<Meta>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Return the cached metadata for `M`, deriving it on first use.
///
/// Concurrent first calls derive at most once; every caller gets the same
/// `Arc`. Failures are returned and never cached, so a broken declaration
/// fails the same way on every call.
pub fn try_get_meta<M: Model>() -> Result<Arc<Meta>, MetaError> {
    let key = TypeId::of::<M>();

    if let Some(meta) = REGISTRY.read().get(&key) {
        return Ok(Arc::clone(meta));
    }

    let mut registry = REGISTRY.write();
    if let Some(meta) = registry.get(&key) {
        return Ok(Arc::clone(meta));
    }

    let meta = Arc::new(Meta::derive::<M>()?);
    tracing::debug!(
        model = meta.model,
        plural = %meta.plural,
        fields = meta.fields.len(),
        "Registered model metadata"
    );
    registry.insert(key, Arc::clone(&meta));
    Ok(meta)
}

/// Like `try_get_meta`, but an invalid declaration is a programming error.
pub fn get_meta<M: Model>() -> Arc<Meta> {
    match try_get_meta::<M>() {
        Ok(meta) => meta,
        Err(e) => panic!("invalid model declaration: {}", e),
    }
}
