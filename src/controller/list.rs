use serde_json::Value;

use super::{Controller, Scope};
use crate::api::format::resource_objects;
use crate::api::{ApiResult, JsonApi};
use crate::callback::{Action, RawRequest};
use crate::database::document::decode_all;
use crate::filter::Filter;

impl Controller {
    /// `GET /{plural}` with `filter[..]`, `sort`, `fields[..]` and
    /// `<relationship>-id` parameters.
    pub async fn list(&self, scope: &Scope, request: RawRequest) -> ApiResult {
        let mut ctx = self.context(Action::List, scope, request);
        self.authorize(&mut ctx).await?;

        let filter = Filter::from_params(&self.meta, &ctx.request.params)?;
        ctx.query = Some(filter.query.clone());

        let documents = scope.store.find(&self.meta.collection, &filter.query).await?;
        let models = decode_all(&self.meta, &documents)?;

        let data = resource_objects(
            &scope.prefix,
            &self.meta,
            &models,
            filter.fields_for(&self.meta.plural),
        )?;

        tracing::debug!(model = %self.meta.plural, count = data.len(), elapsed = ?ctx.execution_time(), "list");
        Ok(JsonApi::data(Value::Array(data)))
    }
}
