// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;

use httpmock::Method::POST;
use httpmock::{Mock, MockServer};
use reqwest::Client;
use serde_json::Value;

use crate::config::api::{ApiEndpoints, Credential};
use crate::config::proc_loader::parse_config;
use crate::config::types::ServiceConfig;
use crate::resilience::retry::RetrySettings;
use crate::sources::fetch::PaginatedFetcher;
use crate::sources::oauth2::TokenManager;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// No retries unless a test asks for them.
pub fn no_retry() -> RetrySettings {
    RetrySettings { attempts: 1, base_delay_ms: 1, max_delay_ms: 1 }
}

/// Upstream layout used by every test: `/oauth/token`, `/v3/` and `/roster/`.
pub fn endpoints(base_url: &str) -> ApiEndpoints {
    ApiEndpoints {
        token_url: format!("{}/oauth/token", base_url),
        api_base_url: format!("{}/v3/", base_url),
        roster_base_url: format!("{}/roster/", base_url),
    }
}

pub fn credential() -> Credential {
    Credential {
        school: "springfield".into(),
        client_id: "test-client".into(),
        client_secret: "test-secret".into(),
        scopes: BTreeSet::from(["classes:list".to_string(), "academics.enrollments:list".to_string()]),
    }
}

pub fn build_fetcher(base_url: &str, page_size: usize, retry: RetrySettings) -> PaginatedFetcher {
    let client = build_reqwest_client();
    let endpoints = endpoints(base_url);
    let tokens = TokenManager::new(client.clone(), endpoints.token_url.clone(), credential(), true, 60);
    PaginatedFetcher::new(client, tokens, endpoints, page_size, 2, retry)
}

/// Token endpoint answering with `access_token`.
pub fn mock_token<'a>(server: &'a MockServer, access_token: &str) -> Mock<'a> {
    let body = json!({"access_token": access_token, "token_type": "Bearer", "expires_in": 3600});
    server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .form_urlencoded_tuple("grant_type", "client_credentials")
            .form_urlencoded_tuple("client_id", "test-client");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(body);
    })
}

/// Full service config against a mock upstream.
pub async fn test_config(base_url: &str, index_path: &Path, fetch_class_list: bool) -> ServiceConfig {
    let yaml = format!(
        r#"
settings:
  retry:
    attempts: 1
    base_delay_ms: 1
    max_delay_ms: 1
  logging:
    level: debug
    format: compact
api:
  school: springfield
  client_id: test-client
  client_secret: test-secret
  scopes: ["classes:list", "academics.enrollments:list"]
  page_size: 500
  request_timeout_ms: 5000
  token_url: "{base}/oauth/token"
  api_base_url: "{base}/v3/"
  roster_base_url: "{base}/roster/"
index:
  path: "{index}"
pipeline:
  fetch_class_list: {fetch_class_list}
"#,
        base = base_url,
        index = index_path.display(),
        fetch_class_list = fetch_class_list,
    );
    parse_config(yaml).await.expect("test config must be valid")
}

/// Roster directory with the given (sourcedId, email) users.
pub fn snapshot_json(users: &[(&str, &str)]) -> Value {
    let users: Vec<Value> = users
        .iter()
        .map(|(id, email)| json!({"sourcedId": id, "email": email, "role": "student"}))
        .collect();
    json!([{"users": users}])
}

pub fn write_snapshot(path: &Path, users: &[(&str, &str)]) {
    std::fs::write(path, serde_json::to_vec(&snapshot_json(users)).unwrap()).unwrap();
}
