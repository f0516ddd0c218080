use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use snaptron::config::{ConfigV1, extract};
use snaptron::routes::create_router;
use snaptron::startup::build_state;
use serde_json::{Value, json};
use tower::ServiceExt;

pub fn load_config(yaml: &str) -> ConfigV1 {
    let figment = Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Serialized::default("transport.type", "http"))
        .merge(Yaml::string(yaml));
    extract(&figment).expect("Failed to parse test config YAML")
}

pub fn build_app(config: ConfigV1) -> Router {
    let state = build_state(Arc::new(config)).expect("failed to build state");
    create_router(state)
}

pub async fn get(app: &Router, path: &str) -> (Response<Body>, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should complete");
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("failed to read body");
    (
        Response::from_parts(parts, Body::empty()),
        String::from_utf8(bytes.to_vec()).expect("body is not UTF-8"),
    )
}

/// A provider response wrapped in the remote API envelope.
pub fn envelope(snap_id: &str, metric_name: &str, buckets: &[&str], series: Value) -> String {
    json!({
        "metrics": [{
            "snap_id": snap_id,
            "metric_name": metric_name,
            "status": "OK",
            "buckets": buckets,
            "series": series,
        }]
    })
    .to_string()
}
