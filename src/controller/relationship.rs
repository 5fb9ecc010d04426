use std::sync::Arc;

use axum::body::Bytes;
use serde_json::{json, Value};

use super::{check_structure, Controller, Scope};
use crate::api::document::parse_linkage;
use crate::api::format::{resource_object, resource_objects};
use crate::api::relationships::{self, add_linkage, identifier, linkage, linked_ids, remove_linkage, set_linkage};
use crate::api::{ApiResult, JsonApi};
use crate::callback::{Action, Context, RawRequest};
use crate::database::document::{decode, decode_all, encode};
use crate::database::store::document_id;
use crate::database::Document;
use crate::error::ApiError;
use crate::filter::{Filter, Query};
use crate::model::{Field, Id, Instance, Meta, RelationKind};

/// How a relationship request changes the linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkageChange {
    /// PATCH: replace the whole linkage
    Replace,
    /// POST: add members to a to-many linkage
    Add,
    /// DELETE: remove members from a to-many linkage
    Remove,
}

impl Controller {
    fn relation_field(&self, name: &str) -> Result<&Field, ApiError> {
        self.meta
            .relationship(name)
            .ok_or_else(|| self.missing_relationship(name))
    }

    fn missing_relationship(&self, name: &str) -> ApiError {
        ApiError::not_found(format!("{} has no relationship '{}'", self.meta.plural, name))
    }

    /// Targets must be mounted in the same group to be followed.
    fn target_meta(&self, scope: &Scope, field: &Field) -> Result<Arc<Meta>, ApiError> {
        scope.resource(&field.rel_type).cloned().ok_or_else(|| {
            ApiError::not_found(format!(
                "Relationship '{}' of {} targets '{}', which is not served here",
                field.rel_name, self.meta.plural, field.rel_type
            ))
        })
    }

    /// Start a relationship request: authorize, then load the owner.
    async fn open_relationship(
        &self,
        action: Action,
        scope: &Scope,
        id: &str,
        name: &str,
        request: RawRequest,
    ) -> Result<(Context, Id, Box<dyn Instance>), ApiError> {
        let mut ctx = self.context(action, scope, request);
        ctx.relationship = Some(name.to_string());
        self.authorize(&mut ctx).await?;

        let id = self.parse_path_id(id)?;
        let owner = self.load(scope, id).await?;
        Ok((ctx, id, owner))
    }

    /// Documents of a has-many target whose foreign key holds `owner`.
    async fn has_many_documents(
        &self,
        scope: &Scope,
        field: &Field,
        owner: Id,
    ) -> Result<(Arc<Meta>, Vec<Document>), ApiError> {
        let target = self.target_meta(scope, field)?;
        let foreign_key = target
            .relationship(&field.rel_inverse)
            .or_else(|| target.field(&field.rel_inverse))
            .filter(|f| f.is_stored())
            .map(|f| f.bson_name.clone())
            .ok_or_else(|| {
                ApiError::internal(format!(
                    "{} has no foreign key '{}' for {}",
                    target.plural, field.rel_inverse, field.rel_name
                ))
            })?;

        let query = Query::new().eq(foreign_key, owner.to_string());
        let documents = scope.store.find(&target.collection, &query).await?;
        Ok((target, documents))
    }

    /// `GET /{plural}/:id/{relationship}`: the related resources themselves.
    pub async fn related(&self, scope: &Scope, id: &str, name: &str, request: RawRequest) -> ApiResult {
        let field = self.relation_field(name)?;
        let (ctx, id, owner) = self
            .open_relationship(Action::RelationshipQuery, scope, id, name, request)
            .await?;
        let fields = Filter::sparse_fields(&ctx.request.params);

        match field.relation {
            RelationKind::ToOne => {
                let target = self.target_meta(scope, field)?;
                let Some(target_id) = linked_ids(&self.meta, field, owner.as_ref())?.first().copied() else {
                    return Ok(JsonApi::data(Value::Null));
                };
                let Some(document) = scope.store.find_one(&target.collection, target_id).await? else {
                    return Ok(JsonApi::data(Value::Null));
                };
                let model = decode(&target, &document)?;
                let selected = fields.get(&target.plural).map(Vec::as_slice);
                Ok(JsonApi::data(resource_object(&scope.prefix, &target, model.as_ref(), selected)?))
            }
            RelationKind::ToMany => {
                let target = self.target_meta(scope, field)?;
                let ids = linked_ids(&self.meta, field, owner.as_ref())?;
                let wanted = ids.iter().map(|id| Value::String(id.to_string())).collect();
                let documents = scope
                    .store
                    .find(&target.collection, &Query::new().filter("_id", wanted))
                    .await?;

                // Keep the order of the stored linkage
                let mut ordered = Vec::with_capacity(ids.len());
                for id in &ids {
                    if let Some(doc) = documents.iter().find(|d| document_id(d).ok() == Some(*id)) {
                        ordered.push(doc.clone());
                    }
                }

                let models = decode_all(&target, &ordered)?;
                let selected = fields.get(&target.plural).map(Vec::as_slice);
                let data = resource_objects(&scope.prefix, &target, &models, selected)?;
                Ok(JsonApi::data(Value::Array(data)))
            }
            RelationKind::HasMany => {
                let (target, documents) = self.has_many_documents(scope, field, id).await?;
                let models = decode_all(&target, &documents)?;
                let selected = fields.get(&target.plural).map(Vec::as_slice);
                let data = resource_objects(&scope.prefix, &target, &models, selected)?;
                Ok(JsonApi::data(Value::Array(data)))
            }
            RelationKind::None => Err(self.missing_relationship(name)),
        }
    }

    /// `GET /{plural}/:id/relationships/{relationship}`: the linkage.
    pub async fn relationship(&self, scope: &Scope, id: &str, name: &str, request: RawRequest) -> ApiResult {
        let field = self.relation_field(name)?;
        let (_ctx, id, owner) = self
            .open_relationship(Action::RelationshipQuery, scope, id, name, request)
            .await?;

        let data = match field.relation {
            RelationKind::HasMany => {
                let (target, documents) = self.has_many_documents(scope, field, id).await?;
                let ids = documents
                    .iter()
                    .map(|d| document_id(d).map(|id| identifier(&target.plural, id)))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(ids)
            }
            _ => linkage(&self.meta, field, owner.as_ref())?,
        };

        Ok(JsonApi::ok(self.linkage_document(scope, id, field, data)))
    }

    /// PATCH, POST and DELETE on `/{plural}/:id/relationships/{relationship}`.
    pub async fn update_relationship(
        &self,
        scope: &Scope,
        id: &str,
        name: &str,
        change: LinkageChange,
        request: RawRequest,
        body: Bytes,
    ) -> ApiResult {
        let field = self.relation_field(name)?;
        let (mut ctx, id, owner) = self
            .open_relationship(Action::RelationshipUpdate, scope, id, name, request)
            .await?;

        let data = parse_linkage(&body)?;
        let mut model = owner.clone();
        match change {
            LinkageChange::Replace => set_linkage(&self.meta, field, model.as_mut(), &data)?,
            LinkageChange::Add => add_linkage(&self.meta, field, model.as_mut(), &data)?,
            LinkageChange::Remove => remove_linkage(&self.meta, field, model.as_mut(), &data)?,
        }
        check_structure(&self.meta, model.as_ref())?;

        ctx.original = Some(owner);
        ctx.model = Some(model);
        self.validate(&mut ctx).await?;

        let mut model = ctx
            .model
            .take()
            .ok_or_else(|| ApiError::internal("validator removed the resource"))?;
        self.meta.set_id(model.as_mut(), id)?;

        let replaced = scope
            .store
            .replace(&self.meta.collection, id, encode(&self.meta, model.as_ref())?)
            .await?;
        if !replaced {
            return Err(self.not_found(id));
        }

        tracing::info!(model = %self.meta.plural, %id, relationship = %name, ?change, "Updated relationship");
        let data = linkage(&self.meta, field, model.as_ref())?;
        Ok(JsonApi::ok(self.linkage_document(scope, id, field, data)))
    }

    fn linkage_document(&self, scope: &Scope, id: Id, field: &Field, data: Value) -> Value {
        json!({
            "data": data,
            "links": relationships::links(&scope.prefix, &self.meta.plural, id, &field.rel_name),
        })
    }
}
