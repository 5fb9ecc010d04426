pub mod api;
pub mod auth;
pub mod callback;
pub mod config;
pub mod controller;
pub mod database;
pub mod demo;
pub mod error;
pub mod filter;
pub mod group;
pub mod model;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use api::{ApiResult, JsonApi};
pub use callback::{Action, Callback, CallbackError, Context};
pub use config::AppConfig;
pub use controller::{Controller, LinkageChange, Scope};
pub use database::{MemoryStore, Store};
pub use error::ApiError;
pub use group::Group;
pub use model::{get_meta, try_get_meta, Base, Declaration, Id, Meta, Model};

/// The full HTTP application: the group's resource routes plus the index and
/// health endpoints, with the layers `config` asks for.
pub fn app(config: &AppConfig, group: Group) -> Router {
    let prefix = group.scope().prefix.clone();
    let resources: Vec<String> = group
        .names()
        .into_iter()
        .map(|name| format!("{}/{}", prefix, name))
        .collect();

    let mut app = Router::new()
        .route("/", get(move || root(resources)))
        .route("/health", get(health))
        .merge(group.router())
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn root(resources: Vec<String>) -> JsonApi {
    JsonApi::ok(json!({
        "meta": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
        },
        "links": {
            "resources": resources,
        }
    }))
}

async fn health() -> JsonApi {
    JsonApi::ok(json!({
        "meta": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}

async fn fallback() -> impl IntoResponse {
    ApiError::not_found("No route matches this path")
}
