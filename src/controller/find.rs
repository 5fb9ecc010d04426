use super::{Controller, Scope};
use crate::api::{ApiResult, JsonApi};
use crate::callback::{Action, RawRequest};
use crate::filter::Filter;

impl Controller {
    /// `GET /{plural}/:id`
    pub async fn find(&self, scope: &Scope, id: &str, request: RawRequest) -> ApiResult {
        let mut ctx = self.context(Action::Find, scope, request);
        self.authorize(&mut ctx).await?;

        let id = self.parse_path_id(id)?;
        let model = self.load(scope, id).await?;

        let fields = Filter::sparse_fields(&ctx.request.params);
        let data = self.render(scope, model.as_ref(), fields.get(&self.meta.plural).map(Vec::as_slice))?;

        Ok(JsonApi::data(data))
    }
}
