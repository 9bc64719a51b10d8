#![allow(dead_code)]

use sha2::{Digest, Sha256};
use signvault::{ClientConfig, ContentIdentifier, GatewayClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// Client settings pointing at `server` with millisecond backoff so retry
/// tests finish quickly.
pub fn fast_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_token: Some(TOKEN.to_string()),
        gateway_url: format!("{}/ipfs/{{cid}}", server.uri()),
        upload_url: format!("{}/upload", server.uri()),
        max_concurrent_requests: 10,
        rate_limit_per_window: 1000,
        rate_window_ms: 1000,
        request_timeout_ms: 2000,
        retry_attempts: 3,
        backoff_min_ms: 10,
        backoff_max_ms: 40,
        ..Default::default()
    }
}

pub fn client_for(server: &MockServer) -> GatewayClient {
    GatewayClient::new(fast_config(server)).unwrap()
}

pub fn cid(raw: &str) -> ContentIdentifier {
    ContentIdentifier::new(raw).unwrap()
}

pub async fn mount_blob(server: &MockServer, id: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", id)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of requests the mock server received for `path`.
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

/// A tiny content-addressed network: uploads are stored under the SHA-256
/// of their body and served back from `/ipfs/<cid>`.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

struct UploadResponder(FakeNetwork);
struct GatewayResponder(FakeNetwork);

impl Respond for UploadResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let cid = format!("bafk{}", hex::encode(Sha256::digest(&request.body)));
        self.0
            .blobs
            .lock()
            .unwrap()
            .insert(cid.clone(), request.body.clone());
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cid": cid }))
    }
}

impl Respond for GatewayResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let cid = request.url.path().trim_start_matches("/ipfs/");
        match self.0.blobs.lock().unwrap().get(cid) {
            Some(body) => ResponseTemplate::new(200).set_body_bytes(body.clone()),
            None => ResponseTemplate::new(404),
        }
    }
}

impl FakeNetwork {
    pub async fn mount(server: &MockServer) -> Self {
        let network = FakeNetwork::default();
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(UploadResponder(network.clone()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/ipfs/.+$"))
            .respond_with(GatewayResponder(network.clone()))
            .mount(server)
            .await;
        network
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

pub fn slow(body: &[u8], delay_ms: u64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(body.to_vec())
        .set_delay(Duration::from_millis(delay_ms))
}
