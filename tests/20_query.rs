mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{attribute, ids, to_one, TestServer};

async fn list(server: &TestServer, path: &str, query: &[(&str, &str)]) -> Result<Value> {
    let res = server.client.get(server.url(path)).query(query).send().await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "list returned {}", res.status());
    Ok(res.json::<Value>().await?)
}

#[tokio::test]
async fn filter_by_title() -> Result<()> {
    let server = TestServer::spawn().await?;
    let first = server.create_post("v1").await?;
    let second = server.create_post("v2").await?;
    let third = server.create_post("v3").await?;

    let body = list(&server, "/posts", &[("filter[title]", "v1")]).await?;
    assert_eq!(ids(&body), vec![first]);

    let body = list(&server, "/posts", &[("filter[title]", "v2,v3")]).await?;
    assert_eq!(ids(&body), vec![second, third]);

    let body = list(&server, "/posts", &[("filter[title]", "nope")]).await?;
    assert_eq!(body, json!({ "data": [] }));

    Ok(())
}

#[tokio::test]
async fn unknown_or_unfilterable_keys_are_ignored() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create_post("a").await?;
    server.create_post("b").await?;

    // text-body is not filterable, color does not exist
    let body = list(
        &server,
        "/posts",
        &[("filter[text-body]", "zzz"), ("filter[color]", "red"), ("sort", "color")],
    )
    .await?;
    assert_eq!(attribute(&body, "title"), vec!["a", "b"]);

    Ok(())
}

#[tokio::test]
async fn sort_by_title() -> Result<()> {
    let server = TestServer::spawn().await?;
    for title in ["2", "1", "3"] {
        server.create_post(title).await?;
    }

    let body = list(&server, "/posts", &[("sort", "title")]).await?;
    assert_eq!(attribute(&body, "title"), vec!["1", "2", "3"]);

    let body = list(&server, "/posts", &[("sort", "-title")]).await?;
    assert_eq!(attribute(&body, "title"), vec!["3", "2", "1"]);

    // No sort keeps insertion order
    let body = list(&server, "/posts", &[]).await?;
    assert_eq!(attribute(&body, "title"), vec!["2", "1", "3"]);

    Ok(())
}

#[tokio::test]
async fn sort_ties_keep_storage_order() -> Result<()> {
    let server = TestServer::spawn().await?;
    for (name, title) in [("first", "same"), ("second", "other"), ("third", "same")] {
        server
            .create("posts", json!({ "title": title, "text-body": name }), json!({}))
            .await?;
    }

    let body = list(&server, "/posts", &[("sort", "-title")]).await?;
    assert_eq!(attribute(&body, "text-body"), vec!["first", "third", "second"]);

    Ok(())
}

#[tokio::test]
async fn sparse_fieldsets() -> Result<()> {
    let server = TestServer::spawn().await?;
    let id = server.create_post("Sparse").await?;

    let body = list(&server, "/posts", &[("fields[posts]", "title")]).await?;
    let attributes = body["data"][0]["attributes"].as_object().cloned().unwrap_or_default();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes["title"], "Sparse");
    // Relationships are not affected
    assert!(body["data"][0]["relationships"]["comments"].is_object());

    let res = server
        .client
        .get(server.url(&format!("/posts/{}", id)))
        .query(&[("fields[posts]", "text-body")])
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["attributes"], json!({ "text-body": "" }));

    // Fieldsets for other types do not apply
    let body = list(&server, "/posts", &[("fields[comments]", "message")]).await?;
    assert_eq!(body["data"][0]["attributes"].as_object().map(|a| a.len()), Some(2));

    Ok(())
}

#[tokio::test]
async fn relationship_scoped_filter() -> Result<()> {
    let server = TestServer::spawn().await?;
    let post = server.create_post("Parent").await?;
    let other = server.create_post("Other").await?;

    let mine = server
        .create("comments", json!({ "message": "mine" }), json!({ "post": to_one("posts", &post) }))
        .await?;
    server
        .create("comments", json!({ "message": "theirs" }), json!({ "post": to_one("posts", &other) }))
        .await?;

    let body = list(&server, "/comments", &[("post-id", post.as_str())]).await?;
    assert_eq!(ids(&body), vec![common::id_of(&mine)?]);

    let res = server
        .client
        .get(server.url("/comments"))
        .query(&[("post-id", "garbage")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
