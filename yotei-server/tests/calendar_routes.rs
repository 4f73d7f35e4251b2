//! Route tests against a mocked upstream and a temp-dir store.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header as auth_header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yotei_core::{AccountCache, CalendarInfo};
use yotei_server::config::ServerConfig;
use yotei_server::state::AppState;

struct TestServer {
    upstream: MockServer,
    state: AppState,
    _dir: tempfile::TempDir,
}

async fn setup() -> TestServer {
    let upstream = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        port: 0,
        data_dir: dir.path().to_path_buf(),
        google_client_id: "client-id".to_string(),
        google_client_secret: "client-secret".to_string(),
        session_secret: "test-secret".to_string(),
        token_url: Some(format!("{}/token", upstream.uri())),
        calendar_api_url: Some(upstream.uri()),
    };
    TestServer {
        upstream,
        state: AppState::new(&config),
        _dir: dir,
    }
}

impl TestServer {
    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let app = yotei_server::app(self.state.clone());
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn sign_in(&self, expires_in_secs: i64) -> String {
        let payload = json!({
            "uid": "u1",
            "email": "a@x",
            "displayName": "A",
            "accessToken": "live-token",
            "refreshToken": "refresh-1",
            "expiresAt": (Utc::now() + Duration::seconds(expires_in_secs)).to_rfc3339(),
        });
        let (status, body) = self
            .request(
                Request::post("/session")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessionToken"].as_str().unwrap().to_string()
    }

    async fn get(&self, uri: &str, session_token: &str) -> (StatusCode, Value) {
        self.request(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

fn calendar_list_body() -> Value {
    json!({
        "items": [
            {
                "id": "a@x",
                "summary": "a@x",
                "primary": true,
                "backgroundColor": "#9fe1e7",
                "foregroundColor": "#000000"
            }
        ]
    })
}

fn events_body() -> Value {
    json!({
        "items": [
            {
                "id": "ev1",
                "summary": "Standup",
                "start": {"dateTime": "2025-01-10T09:00:00+09:00"},
                "end": {"dateTime": "2025-01-10T09:30:00+09:00"}
            },
            {
                "id": "ev2",
                "summary": "Holiday",
                "start": {"date": "2025-01-11"},
                "end": {"date": "2025-01-12"}
            }
        ]
    })
}

async fn mount_primary_mocks(upstream: &MockServer, bearer: &str) {
    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .and(auth_header("authorization", format!("Bearer {bearer}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(calendar_list_body()))
        .mount(upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(auth_header("authorization", format!("Bearer {bearer}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
        .mount(upstream)
        .await;
}

#[tokio::test]
async fn test_calendar_requires_a_session() {
    let server = setup().await;
    let (status, body) = server
        .request(Request::get("/calendar").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_get_calendar_returns_primary_and_persists() {
    let server = setup().await;
    mount_primary_mocks(&server.upstream, "live-token").await;

    let token = server.sign_in(3600).await;
    let (status, body) = server.get("/calendar", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x");
    assert_eq!(body["calendars"]["email"], "a@x");
    assert_eq!(body["events"].as_array().unwrap().len(), 2);

    // The fetch is cached server-side.
    let accounts = server.state.store.read_accounts("u1").await.unwrap();
    assert_eq!(accounts["a@x"].events.len(), 2);
    assert_eq!(
        accounts["a@x"].calendar_info.color.as_ref().unwrap().background,
        "#9fe1e7"
    );
}

#[tokio::test]
async fn test_get_specific_calendar_persists_under_its_email() {
    let server = setup().await;
    Mock::given(method("GET"))
        .and(path("/calendars/b@x/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
        .mount(&server.upstream)
        .await;

    let token = server.sign_in(3600).await;
    let (status, body) = server.get("/calendar/b@x", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x");
    assert_eq!(body["events"].as_array().unwrap().len(), 2);

    let accounts = server.state.store.read_accounts("u1").await.unwrap();
    assert_eq!(accounts["b@x"].events.len(), 2);
}

#[tokio::test]
async fn test_unknown_calendar_maps_to_404() {
    let server = setup().await;
    Mock::given(method("GET"))
        .and(path("/calendars/gone@x/events"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server.upstream)
        .await;

    let token = server.sign_in(3600).await;
    let (status, body) = server.get("/calendar/gone@x", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("gone@x"));
}

#[tokio::test]
async fn test_create_event_appends_to_the_cached_account() {
    let server = setup().await;
    server
        .state
        .store
        .write_account(
            "u1",
            "a@x",
            &AccountCache {
                events: vec![],
                calendar_info: CalendarInfo::for_email("a@x"),
                last_updated: Utc::now(),
            },
        )
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/calendars/a@x/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "created-1",
            "summary": "Planning",
            "start": {"dateTime": "2025-01-20T13:00:00+09:00"},
            "end": {"dateTime": "2025-01-20T14:00:00+09:00"}
        })))
        .expect(1)
        .mount(&server.upstream)
        .await;

    let token = server.sign_in(3600).await;
    let (status, body) = server
        .request(
            Request::post("/calendar/a@x")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "summary": "Planning",
                        "start": {"dateTime": "2025-01-20T13:00:00+09:00"},
                        "end": {"dateTime": "2025-01-20T14:00:00+09:00"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "created-1");

    let accounts = server.state.store.read_accounts("u1").await.unwrap();
    assert_eq!(accounts["a@x"].events.len(), 1);
    assert_eq!(accounts["a@x"].events[0].id, "created-1");
}

#[tokio::test]
async fn test_invalid_event_is_rejected_without_upstream_call() {
    let server = setup().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server.upstream)
        .await;

    let token = server.sign_in(3600).await;
    let (status, _body) = server
        .request(
            Request::post("/calendar/a@x")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "summary": "Backwards",
                        "start": {"dateTime": "2025-01-20T14:00:00+09:00"},
                        "end": {"dateTime": "2025-01-20T13:00:00+09:00"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_patch_calendar_info_merges_metadata() {
    let server = setup().await;
    server
        .state
        .store
        .write_account(
            "u1",
            "a@x",
            &AccountCache {
                events: vec![],
                calendar_info: CalendarInfo::for_email("a@x"),
                last_updated: Utc::now(),
            },
        )
        .await
        .unwrap();

    let token = server.sign_in(3600).await;
    let (status, _body) = server
        .request(
            Request::patch("/calendar/a@x")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"displayName": "Work"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let accounts = server.state.store.read_accounts("u1").await.unwrap();
    assert_eq!(
        accounts["a@x"].calendar_info.display_name.as_deref(),
        Some("Work")
    );
}

#[tokio::test]
async fn test_hide_keyword_roundtrip() {
    let server = setup().await;
    let token = server.sign_in(3600).await;

    let (status, _body) = server
        .request(
            Request::post("/user/keywords")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"keyword": "lunch"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = server.get("/user", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hideKeywords"], json!(["lunch"]));

    let (status, _body) = server
        .request(
            Request::delete("/user/keywords/lunch")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_status, body) = server.get("/user", &token).await;
    assert_eq!(body["hideKeywords"], json!([]));
}

#[tokio::test]
async fn test_near_expiry_session_refreshes_before_fetching() {
    let server = setup().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server.upstream)
        .await;
    // Upstream only accepts the refreshed credential.
    mount_primary_mocks(&server.upstream, "new-token").await;

    // 10s to expiry is inside the 300s safety window.
    let token = server.sign_in(10).await;
    let (status, body) = server.get("/calendar", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x");
}

#[tokio::test]
async fn test_failed_refresh_maps_to_unauthorized() {
    let server = setup().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server.upstream)
        .await;

    let token = server.sign_in(10).await;
    let (status, body) = server.get("/calendar", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_logged_out_session_is_gone() {
    let server = setup().await;
    let token = server.sign_in(3600).await;

    let (status, _body) = server
        .request(
            Request::delete("/session")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _body) = server.get("/calendar", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
