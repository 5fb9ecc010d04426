use axum::body::Bytes;

use super::{check_structure, Controller, Scope};
use crate::api::document::ResourceBody;
use crate::api::{ApiResult, JsonApi};
use crate::callback::{Action, RawRequest};
use crate::database::document::encode;
use crate::error::ApiError;

impl Controller {
    /// `POST /{plural}`
    pub async fn create(&self, scope: &Scope, request: RawRequest, body: Bytes) -> ApiResult {
        let mut ctx = self.context(Action::Create, scope, request);
        self.authorize(&mut ctx).await?;

        let body = ResourceBody::parse(&body, &self.meta)?;
        let mut model = self.meta.new_instance();
        body.apply(&self.meta, model.as_mut())?;

        if let Some(id) = body.parsed_id()? {
            self.meta.set_id(model.as_mut(), id)?;
        }
        let id = self.meta.ensure_id(model.as_mut())?;

        check_structure(&self.meta, model.as_ref())?;
        ctx.model = Some(model);
        self.validate(&mut ctx).await?;

        let model = ctx
            .model
            .take()
            .ok_or_else(|| ApiError::internal("validator removed the resource"))?;
        scope
            .store
            .insert(&self.meta.collection, encode(&self.meta, model.as_ref())?)
            .await?;

        tracing::info!(model = %self.meta.plural, %id, "Created resource");
        Ok(JsonApi::created(self.render(scope, model.as_ref(), None)?))
    }
}
