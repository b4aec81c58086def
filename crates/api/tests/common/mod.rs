#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use provision_api::catalog;
use provision_api::config::ServerConfig;
use provision_api::router::build_app_router;
use provision_api::state::AppState;
use provision_api::stores::MemoryStores;
use provision_core::import::ImportHook;
use provision_events::{EventBus, PublishOnImport};
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        event_bus_capacity: 64,
    }
}

/// The application router over in-memory stores, plus the handles tests
/// inspect.
pub struct TestApp {
    pub router: Router,
    pub stores: Arc<MemoryStores>,
    pub event_bus: Arc<EventBus>,
}

/// Build the full application router with all middleware layers, using
/// fresh in-memory stores and the standard command catalog.
pub fn build_test_app() -> TestApp {
    let stores = Arc::new(MemoryStores::new());
    let event_bus = Arc::new(EventBus::new(64));
    let hooks: Vec<Arc<dyn ImportHook>> =
        vec![Arc::new(PublishOnImport::new(Arc::clone(&event_bus)))];
    let catalog = catalog::standard(stores.as_ref(), &hooks).expect("standard catalog");

    let state = AppState {
        catalog: Arc::new(catalog),
        config: Arc::new(test_config()),
    };

    TestApp {
        router: build_app_router(state),
        stores,
        event_bus,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<String>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
