//! Shared mock server setup for integration tests.

#![allow(dead_code)]

use serde_json::json;
use ssc_platform::{SscClient, SscConfig};
use std::path::Path;
use wiremock::matchers::{basic_auth, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "s3cret";
pub const SESSION_TOKEN: &str = "session-token-value";

pub fn api_path(endpoint: &str) -> String {
    format!("/ssc/api/v1{endpoint}")
}

pub fn config(server: &MockServer, download_dir: &Path) -> SscConfig {
    SscConfig::new(format!("{}/ssc", server.uri()), USERNAME, PASSWORD)
        .with_download_dir(download_dir)
}

/// Mount a `POST /tokens` answer for one token type.
pub async fn mount_token(server: &MockServer, token_type: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path(api_path("/tokens")))
        .and(basic_auth(USERNAME, PASSWORD))
        .and(body_partial_json(json!({ "type": token_type })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 1, "token": token },
            "responseCode": 201
        })))
        .mount(server)
        .await;
}

pub async fn mount_heartbeat(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(api_path("/features")))
        .and(header("Authorization", format!("FortifyToken {SESSION_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "id": "auditassistant", "enabled": true } ],
            "count": 1,
            "responseCode": 200
        })))
        .mount(server)
        .await;
}

/// Client with an established session against `server`.
pub async fn initialized_client(server: &MockServer, download_dir: &Path) -> SscClient {
    mount_token(server, "UnifiedLoginToken", SESSION_TOKEN).await;
    mount_heartbeat(server).await;

    let mut client = SscClient::new(config(server, download_dir)).unwrap();
    client.initialize().await.unwrap();
    client
}

pub fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data, "responseCode": 200 }))
}
