//! The real HTTP stack against local mock servers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use storefront_client::client::BackendClient;
use storefront_client::transport::{PLAIN_TEXT_UTF8, ReqwestTransport};
use storefront_core::config::HttpSettings;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(timeout_ms: u64, retries: u32) -> HttpSettings {
    HttpSettings {
        timeout_ms,
        retries_per_target: retries,
        backoff_ms: 1,
        jitter: false,
    }
}

fn client(bases: &str, settings: HttpSettings) -> BackendClient {
    let transport = ReqwestTransport::new().expect("transport should build");
    BackendClient::new(Arc::new(transport), bases, settings)
}

#[tokio::test]
async fn test_posts_plain_text_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exec"))
        .and(query_param("route", "menu-save"))
        .and(header("content-type", PLAIN_TEXT_UTF8))
        .and(body_partial_json(json!({"name": "Bakso", "admin_token": "tok"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "id": "BK"})))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&format!("{}/exec", server.uri()), settings(2_000, 2)).with_admin_token("tok");
    let v = c.post("menu-save", json!({"name": "Bakso"}), true).await;
    assert_eq!(v, json!({"ok": true, "id": "BK"}));
}

#[tokio::test]
async fn test_guarded_body_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(")]}'\n[{\"id\":1}]"))
        .mount(&server)
        .await;

    let v = client(&server.uri(), settings(2_000, 1))
        .post("cat-list", Value::Null, false)
        .await;
    assert_eq!(v, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_server_error_retried_on_same_base() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let v = client(&server.uri(), settings(2_000, 3))
        .post("menu-list", Value::Null, false)
        .await;
    assert_eq!(v, json!({"ok": false, "error": "http_502"}));
}

#[tokio::test]
async fn test_unreachable_base_fails_over() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("route", "promo-validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "type": "flat", "value": 1000})))
        .expect(1)
        .mount(&server)
        .await;

    // Port 9 (discard) refuses connections on loopback.
    let bases = format!("http://127.0.0.1:9/exec|{}/exec", server.uri());
    let v = client(&bases, settings(2_000, 2))
        .post("promo-validate", json!({"code": "X"}), false)
        .await;
    assert_eq!(v["value"], 1000);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_millis(1_500)),
        )
        .mount(&server)
        .await;

    let v = client(&server.uri(), settings(100, 2))
        .post("create-order", json!({}), false)
        .await;
    assert_eq!(v, json!({"ok": false, "error": "network_timeout"}));
}
