use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    routing::get,
    Router,
};

use super::Group;
use crate::api::ApiResult;
use crate::callback::RawRequest;
use crate::controller::{Controller, LinkageChange};
use crate::error::ApiError;

#[async_trait]
impl<S> FromRequestParts<S> for RawRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {}", e)))?;

        Ok(RawRequest {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            params,
        })
    }
}

pub(super) fn router(group: Arc<Group>) -> Router {
    let prefix = group.scope().prefix.clone();

    Router::new()
        // Collection
        .route(&format!("{}/:resource", prefix), get(list).post(create))
        // Single resource
        .route(
            &format!("{}/:resource/:id", prefix),
            get(find).patch(update).delete(delete),
        )
        // Related resources
        .route(&format!("{}/:resource/:id/:link", prefix), get(related))
        // Relationship linkage
        .route(
            &format!("{}/:resource/:id/:link/:relationship", prefix),
            get(relationship)
                .patch(replace_relationship)
                .post(add_relationship)
                .delete(remove_relationship),
        )
        .with_state(group)
}

fn controller<'a>(group: &'a Group, resource: &str) -> Result<&'a Arc<Controller>, ApiError> {
    group
        .controller(resource)
        .ok_or_else(|| ApiError::not_found(format!("Unknown resource type '{}'", resource)))
}

/// Only `.../:id/relationships/:name` is a linkage route.
fn linkage_route(link: &str) -> Result<(), ApiError> {
    if link == "relationships" {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("Unknown route segment '{}'", link)))
    }
}

async fn list(State(group): State<Arc<Group>>, Path(resource): Path<String>, request: RawRequest) -> ApiResult {
    controller(&group, &resource)?.list(group.scope(), request).await
}

async fn create(
    State(group): State<Arc<Group>>,
    Path(resource): Path<String>,
    request: RawRequest,
    body: Bytes,
) -> ApiResult {
    controller(&group, &resource)?.create(group.scope(), request, body).await
}

async fn find(
    State(group): State<Arc<Group>>,
    Path((resource, id)): Path<(String, String)>,
    request: RawRequest,
) -> ApiResult {
    controller(&group, &resource)?.find(group.scope(), &id, request).await
}

async fn update(
    State(group): State<Arc<Group>>,
    Path((resource, id)): Path<(String, String)>,
    request: RawRequest,
    body: Bytes,
) -> ApiResult {
    controller(&group, &resource)?.update(group.scope(), &id, request, body).await
}

async fn delete(
    State(group): State<Arc<Group>>,
    Path((resource, id)): Path<(String, String)>,
    request: RawRequest,
) -> ApiResult {
    controller(&group, &resource)?.delete(group.scope(), &id, request).await
}

async fn related(
    State(group): State<Arc<Group>>,
    Path((resource, id, name)): Path<(String, String, String)>,
    request: RawRequest,
) -> ApiResult {
    controller(&group, &resource)?
        .related(group.scope(), &id, &name, request)
        .await
}

async fn relationship(
    State(group): State<Arc<Group>>,
    Path((resource, id, link, name)): Path<(String, String, String, String)>,
    request: RawRequest,
) -> ApiResult {
    linkage_route(&link)?;
    controller(&group, &resource)?
        .relationship(group.scope(), &id, &name, request)
        .await
}

async fn change_relationship(
    group: Arc<Group>,
    (resource, id, link, name): (String, String, String, String),
    change: LinkageChange,
    request: RawRequest,
    body: Bytes,
) -> ApiResult {
    linkage_route(&link)?;
    controller(&group, &resource)?
        .update_relationship(group.scope(), &id, &name, change, request, body)
        .await
}

async fn replace_relationship(
    State(group): State<Arc<Group>>,
    Path(path): Path<(String, String, String, String)>,
    request: RawRequest,
    body: Bytes,
) -> ApiResult {
    change_relationship(group, path, LinkageChange::Replace, request, body).await
}

async fn add_relationship(
    State(group): State<Arc<Group>>,
    Path(path): Path<(String, String, String, String)>,
    request: RawRequest,
    body: Bytes,
) -> ApiResult {
    change_relationship(group, path, LinkageChange::Add, request, body).await
}

async fn remove_relationship(
    State(group): State<Arc<Group>>,
    Path(path): Path<(String, String, String, String)>,
    request: RawRequest,
    body: Bytes,
) -> ApiResult {
    change_relationship(group, path, LinkageChange::Remove, request, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn raw_request_collects_query_parameters() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts?filter%5Btitle%5D=hello&sort=-title")
            .header("authorization", "Bearer abc")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let raw = RawRequest::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(raw.params.get("filter[title]").map(String::as_str), Some("hello"));
        assert_eq!(raw.params.get("sort").map(String::as_str), Some("-title"));
        assert_eq!(raw.header("authorization"), Some("Bearer abc"));
        assert_eq!(raw.uri.path(), "/posts");
    }

    #[test]
    fn only_relationships_is_a_linkage_segment() {
        assert!(linkage_route("relationships").is_ok());
        assert_eq!(linkage_route("comments").unwrap_err().status_code(), 404);
    }
}
