// Generic resource controller. One controller serves one model type; every
// method runs the same pipeline: build a Context, authorize, do the action,
// validate (and clean) mutations, then serialize the result.

mod create;
mod delete;
mod find;
mod list;
mod relationship;
mod update;

pub use relationship::LinkageChange;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::api::format::resource_object;
use crate::callback::{Action, Callback, Context, RawRequest};
use crate::database::document::decode;
use crate::database::Store;
use crate::error::ApiError;
use crate::model::{get_meta, Id, Instance, Meta, Model, RelationKind};

/// Where a controller is mounted and what it stores into.
#[derive(Clone)]
pub struct Scope {
    pub store: Arc<dyn Store>,
    /// Path prefix for generated links, e.g. `/api`.
    pub prefix: String,
    /// Metadata of every resource mounted next to this one, by plural name.
    /// Relationship targets resolve here.
    resources: Arc<HashMap<String, Arc<Meta>>>,
}

impl Scope {
    pub fn new(store: Arc<dyn Store>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            resources: Arc::new(HashMap::new()),
        }
    }

    /// Make `meta` resolvable as a relationship target. Returns the
    /// metadata it replaced, if any.
    pub fn mount(&mut self, meta: Arc<Meta>) -> Option<Arc<Meta>> {
        Arc::make_mut(&mut self.resources).insert(meta.plural.clone(), meta)
    }

    pub fn resource(&self, plural: &str) -> Option<&Arc<Meta>> {
        self.resources.get(plural)
    }

    pub fn resources(&self) -> &Arc<HashMap<String, Arc<Meta>>> {
        &self.resources
    }
}

/// Serves the JSON:API endpoints of one model type.
#[derive(Clone)]
pub struct Controller {
    meta: Arc<Meta>,
    authorizer: Option<Arc<dyn Callback>>,
    validator: Option<Arc<dyn Callback>>,
    cleaner: Option<Arc<dyn Callback>>,
}

impl Controller {
    pub fn new<M: Model>() -> Self {
        Self::for_meta(get_meta::<M>())
    }

    pub fn for_meta(meta: Arc<Meta>) -> Self {
        Self {
            meta,
            authorizer: None,
            validator: None,
            cleaner: None,
        }
    }

    /// Runs first on every action; failures answer 401 (or 500 for system
    /// errors) before the store is touched.
    pub fn authorizer(mut self, cb: Arc<dyn Callback>) -> Self {
        self.authorizer = Some(cb);
        self
    }

    /// Runs on mutations after structural validation, before persisting.
    pub fn validator(mut self, cb: Arc<dyn Callback>) -> Self {
        self.validator = Some(cb);
        self
    }

    /// Runs on delete after the validator, before removal.
    pub fn cleaner(mut self, cb: Arc<dyn Callback>) -> Self {
        self.cleaner = Some(cb);
        self
    }

    pub fn meta(&self) -> &Arc<Meta> {
        &self.meta
    }

    fn context(&self, action: Action, scope: &Scope, request: RawRequest) -> Context {
        Context::new(action, Arc::clone(&self.meta), request, Arc::clone(&scope.store))
            .with_resources(Arc::clone(scope.resources()))
    }

    async fn authorize(&self, ctx: &mut Context) -> Result<(), ApiError> {
        let Some(cb) = &self.authorizer else {
            return Ok(());
        };
        cb.run(ctx).await.map_err(|e| {
            tracing::info!(model = %self.meta.plural, action = ?ctx.action, callback = cb.name(), "Authorization failed");
            ApiError::from_callback(e, true)
        })
    }

    async fn validate(&self, ctx: &mut Context) -> Result<(), ApiError> {
        match &self.validator {
            Some(cb) => cb.run(ctx).await.map_err(ApiError::from),
            None => Ok(()),
        }
    }

    async fn clean(&self, ctx: &mut Context) -> Result<(), ApiError> {
        match &self.cleaner {
            Some(cb) => cb.run(ctx).await.map_err(ApiError::from),
            None => Ok(()),
        }
    }

    /// Ids in paths that do not parse are treated as not found.
    fn parse_path_id(&self, raw: &str) -> Result<Id, ApiError> {
        Id::parse(raw).map_err(|_| self.not_found(raw))
    }

    fn not_found(&self, id: impl std::fmt::Display) -> ApiError {
        ApiError::not_found(format!("No {} with id {}", self.meta.singular, id))
    }

    async fn load(&self, scope: &Scope, id: Id) -> Result<Box<dyn Instance>, ApiError> {
        let document = scope
            .store
            .find_one(&self.meta.collection, id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        Ok(decode(&self.meta, &document)?)
    }

    fn render(&self, scope: &Scope, model: &dyn Instance, fields: Option<&[String]>) -> Result<Value, ApiError> {
        Ok(resource_object(&scope.prefix, &self.meta, model, fields)?)
    }
}

/// Required values must differ from their type's zero value: `""`, `0`,
/// `false`, empty lists and maps, and unset references are all missing.
pub(crate) fn check_structure(meta: &Meta, model: &dyn Instance) -> Result<(), ApiError> {
    for field in meta.fields.iter().filter(|f| f.required && f.is_stored()) {
        let value = meta.get(model, &field.name)?;
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::Bool(b) => !b,
        };
        if empty {
            let name = match field.relation {
                RelationKind::None => &field.json_name,
                _ => &field.rel_name,
            };
            return Err(ApiError::bad_request(format!("'{}' is required", name)));
        }
    }
    Ok(())
}
