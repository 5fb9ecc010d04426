#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use jsonapi_rest::{callback::Callback, config, demo, MemoryStore};

pub const PREFIX: &str = "/api";

/// One app per test, each with its own empty store.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(None).await
    }

    pub async fn spawn_with(authorizer: Option<Arc<dyn Callback>>) -> Result<Self> {
        let group = demo::group(PREFIX, Arc::new(MemoryStore::new()), authorizer)?;
        let mut config = config::config().clone();
        config.api.enable_request_logging = false;
        Self::serve(jsonapi_rest::app(&config, group)).await
    }

    /// Serve any router on an ephemeral port.
    pub async fn serve(app: axum::Router) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, PREFIX, path)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Response> {
        Ok(self.client.patch(self.url(path)).json(body).send().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        Ok(self.client.delete(self.url(path)).send().await?)
    }

    pub async fn delete_with(&self, path: &str, body: &Value) -> Result<Response> {
        Ok(self.client.delete(self.url(path)).json(body).send().await?)
    }

    /// POST a resource and return its `data` member, failing on anything but 201.
    pub async fn create(&self, kind: &str, attributes: Value, relationships: Value) -> Result<Value> {
        let res = self
            .post(&format!("/{}", kind), &resource(kind, attributes, relationships))
            .await?;
        let status = res.status();
        let body = res.json::<Value>().await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create {} returned {}: {}", kind, status, body);
        Ok(body["data"].clone())
    }

    pub async fn create_post(&self, title: &str) -> Result<String> {
        let data = self.create("posts", json!({ "title": title }), json!({})).await?;
        id_of(&data)
    }
}

/// A `{"data": {...}}` request document.
pub fn resource(kind: &str, attributes: Value, relationships: Value) -> Value {
    json!({
        "data": {
            "type": kind,
            "attributes": attributes,
            "relationships": relationships,
        }
    })
}

pub fn to_one(kind: &str, id: &str) -> Value {
    json!({ "data": { "type": kind, "id": id } })
}

pub fn id_of(data: &Value) -> Result<String> {
    data["id"]
        .as_str()
        .map(str::to_string)
        .context("resource object has no id")
}

/// The `id`s of a list response, in order.
pub fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// An attribute of every resource in a list response, in order.
pub fn attribute(body: &Value, name: &str) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["attributes"][name].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub async fn error_detail(res: Response) -> Result<String> {
    let body = res.json::<Value>().await?;
    body["errors"][0]["detail"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("not an error document: {}", body))
}
