mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{error_detail, id_of, resource, TestServer};

#[tokio::test]
async fn post_lifecycle() -> Result<()> {
    let server = TestServer::spawn().await?;

    // Create with only a title
    let res = server
        .post("/posts", &resource("posts", json!({ "title": "Hello World!" }), json!({})))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        res.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/vnd.api+json")
    );
    let body = res.json::<Value>().await?;
    let data = &body["data"];
    assert_eq!(data["type"], "posts");
    assert_eq!(data["attributes"]["title"], "Hello World!");
    assert_eq!(data["attributes"]["text-body"], "");
    let id = id_of(data)?;
    assert!(uuid::Uuid::parse_str(&id).is_ok(), "id is not a UUID: {}", id);

    // Update the body text
    let patch = json!({
        "data": { "type": "posts", "id": id, "attributes": { "text-body": "Some Text..." } }
    });
    let res = server.patch(&format!("/posts/{}", id), &patch).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["attributes"]["text-body"], "Some Text...");
    assert_eq!(body["data"]["attributes"]["title"], "Hello World!");

    let res = server.get(&format!("/posts/{}", id)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["attributes"]["text-body"], "Some Text...");

    // Delete, then the list is empty
    let res = server.delete(&format!("/posts/{}", id)).await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await?.is_empty());

    let res = server.get("/posts").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, r#"{"data":[]}"#);

    Ok(())
}

#[tokio::test]
async fn attributes_round_trip_and_get_is_stable() -> Result<()> {
    let server = TestServer::spawn().await?;
    let data = server
        .create(
            "posts",
            json!({ "title": "Round trip", "text-body": "line one\nline two" }),
            json!({}),
        )
        .await?;
    let id = id_of(&data)?;

    let first = server.get(&format!("/posts/{}", id)).await?.json::<Value>().await?;
    let second = server.get(&format!("/posts/{}", id)).await?.json::<Value>().await?;
    assert_eq!(first, second);
    assert_eq!(first["data"], data);
    assert_eq!(first["data"]["attributes"]["text-body"], "line one\nline two");
    assert_eq!(
        first["data"]["links"]["self"],
        json!(format!("/api/posts/{}", id))
    );
    assert_eq!(
        first["data"]["relationships"]["comments"]["links"]["related"],
        json!(format!("/api/posts/{}/comments", id))
    );
    assert!(first["data"]["relationships"]["comments"].get("data").is_none());

    Ok(())
}

#[tokio::test]
async fn create_honors_supplied_ids() -> Result<()> {
    let server = TestServer::spawn().await?;
    let id = uuid::Uuid::new_v4().to_string();
    let body = json!({ "data": { "type": "posts", "id": id, "attributes": { "title": "Mine" } } });

    let res = server.post("/posts", &body).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<Value>().await?["data"]["id"], json!(id));

    // Same id again
    let res = server.post("/posts", &body).await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Empty id means "generate one"
    let body = json!({ "data": { "type": "posts", "id": "", "attributes": { "title": "Fresh" } } });
    let res = server.post("/posts", &body).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_ne!(res.json::<Value>().await?["data"]["id"], json!(""));

    Ok(())
}

#[tokio::test]
async fn malformed_requests_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;

    // Missing required title
    let res = server.post("/posts", &resource("posts", json!({}), json!({}))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(res).await?, "'title' is required");

    // Wrong type
    let res = server
        .post("/posts", &resource("comments", json!({ "title": "x" }), json!({})))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Malformed id in the body
    let body = json!({ "data": { "type": "posts", "id": "not-a-uuid", "attributes": { "title": "x" } } });
    let res = server.post("/posts", &body).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Wrong attribute type
    let res = server
        .post("/posts", &resource("posts", json!({ "title": 42 }), json!({})))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Not JSON at all
    let res = server
        .client
        .post(server.url("/posts"))
        .body("{ nope")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["errors"][0]["status"], "400");
    assert_eq!(body["errors"][0]["title"], "Bad Request");

    Ok(())
}

#[tokio::test]
async fn update_keeps_identity() -> Result<()> {
    let server = TestServer::spawn().await?;
    let id = server.create_post("Original").await?;

    // Body id must match the path
    let other = uuid::Uuid::new_v4().to_string();
    let patch = json!({ "data": { "type": "posts", "id": other, "attributes": { "title": "Moved" } } });
    let res = server.patch(&format!("/posts/{}", id), &patch).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Clearing a required attribute fails
    let patch = json!({ "data": { "type": "posts", "attributes": { "title": "" } } });
    let res = server.patch(&format!("/posts/{}", id), &patch).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = server.get(&format!("/posts/{}", id)).await?.json::<Value>().await?;
    assert_eq!(body["data"]["attributes"]["title"], "Original");

    Ok(())
}

#[tokio::test]
async fn unknown_resources_and_ids_are_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;
    let missing = uuid::Uuid::new_v4().to_string();
    let patch = json!({ "data": { "type": "posts", "attributes": { "title": "x" } } });

    for res in [
        server.get("/posts/not-an-id").await?,
        server.get(&format!("/posts/{}", missing)).await?,
        server.patch(&format!("/posts/{}", missing), &patch).await?,
        server.delete(&format!("/posts/{}", missing)).await?,
        server.get("/widgets").await?,
        server.get(&format!("/posts/{}/nothing", missing)).await?,
    ] {
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = res.json::<Value>().await?;
        assert_eq!(body["errors"][0]["status"], "404");
    }

    Ok(())
}

#[tokio::test]
async fn index_and_health() -> Result<()> {
    let server = TestServer::spawn().await?;

    let body = server
        .client
        .get(format!("{}/", server.base_url))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(
        body["links"]["resources"],
        json!(["/api/comments", "/api/posts", "/api/selections"])
    );

    let res = server.client.get(format!("{}/health", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["meta"]["status"], "ok");

    Ok(())
}
