use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::context::{Action, Context};
use super::error::CallbackError;
use super::traits::Callback;
use crate::api::relationships::linked_ids;
use crate::filter::Query;
use crate::model::{get_meta, Meta, Model, RelationKind};

/// A collection whose documents point at the resource through one field.
#[derive(Debug, Clone)]
struct Dependent {
    meta: Arc<Meta>,
    field: String,
}

impl Dependent {
    fn of<M: Model>(field: &str) -> Result<Self, CallbackError> {
        let meta = get_meta::<M>();
        let field = meta
            .relationship(field)
            .or_else(|| meta.field(field))
            .filter(|f| f.is_stored())
            .map(|f| f.bson_name.clone())
            .ok_or_else(|| CallbackError::system(format!("{} has no stored field '{}'", meta.plural, field)))?;
        Ok(Self { meta, field })
    }

    fn query(&self, id: &str) -> Query {
        Query::new().eq(self.field.clone(), id)
    }
}

fn resource_id(ctx: &Context) -> Result<String, CallbackError> {
    let model = ctx
        .model
        .as_deref()
        .ok_or_else(|| CallbackError::system("no resource loaded"))?;
    Ok(ctx.meta.id(model)?.to_string())
}

/// Rejects deleting a resource while other resources still reference it.
///
/// ```ignore
/// DependentResourcesValidator::new().with::<Comment>("post")?
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependentResourcesValidator {
    dependents: Vec<Dependent>,
}

impl DependentResourcesValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources of type `M` reference this one through `field`, given by
    /// relationship name or field name.
    pub fn with<M: Model>(mut self, field: &str) -> Result<Self, CallbackError> {
        self.dependents.push(Dependent::of::<M>(field)?);
        Ok(self)
    }
}

#[async_trait]
impl Callback for DependentResourcesValidator {
    fn name(&self) -> &'static str {
        "dependent_resources"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        if ctx.action != Action::Delete {
            return Ok(());
        }

        let id = resource_id(ctx)?;
        for dependent in &self.dependents {
            let count = ctx
                .store
                .count(&dependent.meta.collection, &dependent.query(&id))
                .await?;
            if count > 0 {
                return Err(CallbackError::user(format!(
                    "Resource is still referenced by {} {}",
                    count, dependent.meta.plural
                )));
            }
        }
        Ok(())
    }
}

/// Checks that every to-one and to-many reference points at an existing
/// resource of the target type.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyReferencesValidator;

impl VerifyReferencesValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Callback for VerifyReferencesValidator {
    fn name(&self) -> &'static str {
        "verify_references"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        if !matches!(ctx.action, Action::Create | Action::Update | Action::RelationshipUpdate) {
            return Ok(());
        }
        let Some(model) = ctx.model.as_deref() else {
            return Ok(());
        };

        let meta = Arc::clone(&ctx.meta);
        for field in meta
            .relationships()
            .filter(|f| matches!(f.relation, RelationKind::ToOne | RelationKind::ToMany))
        {
            let ids = linked_ids(&meta, field, model)?;
            if ids.is_empty() {
                continue;
            }

            let target = ctx.resources.get(&field.rel_type).cloned().ok_or_else(|| {
                CallbackError::user(format!(
                    "Relationship '{}' targets '{}', which is not served here",
                    field.rel_name, field.rel_type
                ))
            })?;
            let wanted: Vec<Value> = ids.iter().map(|id| Value::String(id.to_string())).collect();
            let found = ctx
                .store
                .find(&target.collection, &Query::new().filter("_id", wanted))
                .await?;

            for id in &ids {
                let present = found
                    .iter()
                    .any(|doc| doc.get("_id").and_then(Value::as_str) == Some(id.to_string().as_str()));
                if !present {
                    return Err(CallbackError::user(format!(
                        "Relationship '{}' references missing {} {}",
                        field.rel_name, field.rel_type, id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Rejects updates that change any of the listed attributes.
#[derive(Debug, Clone, Default)]
pub struct ProtectedAttributesValidator {
    attributes: Vec<String>,
}

impl ProtectedAttributesValidator {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Callback for ProtectedAttributesValidator {
    fn name(&self) -> &'static str {
        "protected_attributes"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        if ctx.action != Action::Update {
            return Ok(());
        }
        let (Some(model), Some(original)) = (ctx.model.as_deref(), ctx.original.as_deref()) else {
            return Ok(());
        };

        for name in &self.attributes {
            if ctx.meta.get(model, name)? != ctx.meta.get(original, name)? {
                return Err(CallbackError::user(format!("Attribute '{}' cannot be changed", name)));
            }
        }
        Ok(())
    }
}

/// Removes dependent resources before the resource itself is deleted.
#[derive(Debug, Clone, Default)]
pub struct CascadeCleaner {
    dependents: Vec<Dependent>,
}

impl CascadeCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<M: Model>(mut self, field: &str) -> Result<Self, CallbackError> {
        self.dependents.push(Dependent::of::<M>(field)?);
        Ok(self)
    }
}

#[async_trait]
impl Callback for CascadeCleaner {
    fn name(&self) -> &'static str {
        "cascade"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        if ctx.action != Action::Delete {
            return Ok(());
        }

        let id = resource_id(ctx)?;
        for dependent in &self.dependents {
            let removed = ctx
                .store
                .remove_all(&dependent.meta.collection, &dependent.query(&id))
                .await?;
            tracing::debug!(collection = %dependent.meta.collection, removed, "Cascaded delete");
        }
        Ok(())
    }
}
