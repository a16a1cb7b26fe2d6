use critter_api::{ApiClient, ApiConfig, ApiError, Auth};
use critter_types::{AccessKey, Creature, CreatureSummary, FetchResponse};
use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(server: &MockServer) -> ApiClient {
    ApiClient::new(ApiConfig {
        base_url: format!("{}/api/", server.uri()),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap()
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn api_config_defaults() {
    let cfg = ApiConfig::default();
    assert_eq!(cfg.base_url, "http://localhost:3000/api");
    assert_eq!(cfg.timeout_secs, 30);
    assert_eq!(cfg.access_key_header, "x-access-key");
}

#[test]
fn api_config_endpoint_joins_single_slash() {
    let cfg = ApiConfig {
        base_url: "http://example.test/api/".into(),
        ..Default::default()
    };
    assert_eq!(cfg.endpoint("/creatures"), "http://example.test/api/creatures");
    assert_eq!(cfg.endpoint("creatures"), "http://example.test/api/creatures");
}

#[test]
fn api_config_serde_fills_missing_fields() {
    let cfg: ApiConfig = serde_json::from_str(r#"{"base_url":"http://x.test"}"#).unwrap();
    assert_eq!(cfg.base_url, "http://x.test");
    assert_eq!(cfg.timeout_secs, 30);
}

#[test]
fn empty_base_url_rejected() {
    let result = ApiClient::new(ApiConfig {
        base_url: "  ".into(),
        ..Default::default()
    });
    assert!(matches!(result, Err(ApiError::Config(_))));
}

// ── Error mapping ───────────────────────────────────────────────

#[test]
fn error_message_from_json_error_field() {
    let err = ApiError::from_response(500, r#"{"error":"database on fire"}"#);
    assert_eq!(
        err,
        ApiError::Status {
            status: 500,
            message: "database on fire".into()
        }
    );
}

#[test]
fn error_message_from_json_message_field() {
    let err = ApiError::from_response(503, r#"{"message":"maintenance"}"#);
    assert_eq!(err.to_string(), "maintenance (HTTP 503)");
}

#[test]
fn error_message_falls_back_to_plain_text_then_generic() {
    assert_eq!(
        ApiError::from_response(502, "bad gateway"),
        ApiError::Status {
            status: 502,
            message: "bad gateway".into()
        }
    );
    assert_eq!(
        ApiError::from_response(500, ""),
        ApiError::Status {
            status: 500,
            message: "request failed with status 500".into()
        }
    );
    assert_eq!(
        ApiError::from_response(500, "<html>oops</html>"),
        ApiError::Status {
            status: 500,
            message: "request failed with status 500".into()
        }
    );
    assert_eq!(
        ApiError::from_response(500, r#"{"error":"   "}"#),
        ApiError::Status {
            status: 500,
            message: "request failed with status 500".into()
        }
    );
}

#[test]
fn error_status_classification() {
    assert!(ApiError::from_response(409, r#"{"error":"stale"}"#).is_conflict());
    assert!(ApiError::from_response(422, r#"{"error":"too poor"}"#).is_validation());
    assert!(ApiError::from_response(400, "").is_validation());
    assert!(matches!(
        ApiError::from_response(401, ""),
        ApiError::Unauthorized(_)
    ));
    assert!(matches!(
        ApiError::from_response(404, r#"{"code":"not_linked","message":"no account"}"#),
        ApiError::NotLinked(_)
    ));
    assert_eq!(ApiError::from_response(409, "").status(), Some(409));
    assert_eq!(ApiError::from_response(418, "").status(), Some(418));
    assert_eq!(ApiError::Network("x".into()).status(), None);
}

#[test]
fn long_plain_text_is_truncated() {
    let body = "x".repeat(1000);
    match ApiError::from_response(500, &body) {
        ApiError::Status { message, .. } => assert_eq!(message.len(), 200),
        other => panic!("unexpected {other:?}"),
    }
}

// ── Wiremock-based requests ─────────────────────────────────────

#[tokio::test]
async fn get_json_sends_access_key_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/creatures"))
        .and(header("x-access-key", "key-123"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [],
            "summary": {"total": 0, "alive": 0, "deceased": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let key = AccessKey::new("key-123");
    let response: FetchResponse<Creature, CreatureSummary> = client
        .get_json(
            "creatures",
            Auth::AccessKey(&key),
            &[("page".to_string(), "2".to_string())],
        )
        .await
        .unwrap();

    assert!(response.items.is_empty());
    assert_eq!(response.summary, Some(CreatureSummary::default()));
}

#[tokio::test]
async fn get_json_bearer_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/session"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let body: serde_json::Value = client
        .get_json("auth/session", Auth::Bearer("tok"), &[])
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn non_success_becomes_typed_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/inventory"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "boom"})),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result: Result<serde_json::Value, _> =
        client.get_json("inventory", Auth::Anonymous, &[]).await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::Status {
            status: 500,
            message: "boom".into()
        }
    );
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/creatures"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result: Result<FetchResponse<Creature, CreatureSummary>, _> =
        client.get_json("creatures", Auth::Anonymous, &[]).await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let client = ApiClient::new(ApiConfig {
        base_url: "http://127.0.0.1:1".into(),
        timeout_secs: 2,
        ..Default::default()
    })
    .unwrap();

    let result: Result<serde_json::Value, _> =
        client.get_json("creatures", Auth::Anonymous, &[]).await;
    assert!(matches!(result, Err(ApiError::Network(_))));
}
