use axum::body::Bytes;

use super::{check_structure, Controller, Scope};
use crate::api::document::ResourceBody;
use crate::api::{ApiResult, JsonApi};
use crate::callback::{Action, RawRequest};
use crate::database::document::encode;
use crate::error::ApiError;

impl Controller {
    /// `PATCH /{plural}/:id`: partial attributes and relationships, then a
    /// full replace of the stored document.
    pub async fn update(&self, scope: &Scope, id: &str, request: RawRequest, body: Bytes) -> ApiResult {
        let mut ctx = self.context(Action::Update, scope, request);
        self.authorize(&mut ctx).await?;

        let id = self.parse_path_id(id)?;
        let original = self.load(scope, id).await?;

        let body = ResourceBody::parse(&body, &self.meta)?;
        if let Some(body_id) = body.parsed_id()? {
            if body_id != id {
                return Err(ApiError::bad_request(format!(
                    "Resource id {} does not match {}",
                    body_id, id
                )));
            }
        }

        let mut model = original.clone();
        body.apply(&self.meta, model.as_mut())?;
        check_structure(&self.meta, model.as_ref())?;

        ctx.original = Some(original);
        ctx.model = Some(model);
        self.validate(&mut ctx).await?;

        let mut model = ctx
            .model
            .take()
            .ok_or_else(|| ApiError::internal("validator removed the resource"))?;
        // The id is immutable whatever the hooks did
        self.meta.set_id(model.as_mut(), id)?;

        let replaced = scope
            .store
            .replace(&self.meta.collection, id, encode(&self.meta, model.as_ref())?)
            .await?;
        if !replaced {
            return Err(self.not_found(id));
        }

        tracing::info!(model = %self.meta.plural, %id, "Updated resource");
        Ok(JsonApi::data(self.render(scope, model.as_ref(), None)?))
    }
}
