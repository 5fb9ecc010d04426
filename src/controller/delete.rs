use super::{Controller, Scope};
use crate::api::{ApiResult, JsonApi};
use crate::callback::{Action, RawRequest};

impl Controller {
    /// `DELETE /{plural}/:id`: validator, then cleaner, then removal.
    pub async fn delete(&self, scope: &Scope, id: &str, request: RawRequest) -> ApiResult {
        let mut ctx = self.context(Action::Delete, scope, request);
        self.authorize(&mut ctx).await?;

        let id = self.parse_path_id(id)?;
        ctx.model = Some(self.load(scope, id).await?);

        self.validate(&mut ctx).await?;
        self.clean(&mut ctx).await?;

        if !scope.store.remove(&self.meta.collection, id).await? {
            return Err(self.not_found(id));
        }

        tracing::info!(model = %self.meta.plural, %id, "Deleted resource");
        Ok(JsonApi::no_content())
    }
}
