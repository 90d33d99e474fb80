//! Integration tests for the Trade Union backend.
//!
//! The router runs on an ephemeral port against a temporary SQLite file. A
//! second axum app stands in for Google's token, userinfo and Sheets endpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{Duration, Months, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::SessionCipher;
use crate::config::{Config, GoogleConfig, LogFormat};
use crate::db::{init_database, Repository};
use crate::google::{GoogleCredentials, GoogleOAuth};
use crate::{create_router, AppState};

const SECRET: &str = "test-secret";

/// Recorded traffic and canned data for the fake Google provider.
struct FakeGoogle {
    sheet_rows: Mutex<Vec<Vec<Value>>>,
    writes: Mutex<Vec<(String, Value)>>,
    reads: AtomicUsize,
    refresh_succeeds: AtomicBool,
}

impl FakeGoogle {
    fn new() -> Self {
        Self {
            sheet_rows: Mutex::new(member_sheet()),
            writes: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            refresh_succeeds: AtomicBool::new(true),
        }
    }
}

fn member_sheet() -> Vec<Vec<Value>> {
    vec![
        vec![
            json!("Name of the Member"),
            json!("Trade Union Number"),
            json!("Age"),
            json!("State"),
            json!("Type of Work"),
            json!("Monthly Salary"),
        ],
        vec![
            json!("Asha"),
            json!("TU100"),
            json!(34),
            json!("Kerala"),
            json!("Cooking"),
            json!("9000"),
        ],
        vec![
            json!("Bina"),
            json!("TU101"),
            json!("41"),
            json!("Goa"),
            json!("Cleaning"),
            json!("7000"),
        ],
        vec![json!(""), json!("TU102"), json!("29")],
    ]
}

async fn fake_token(
    State(google): State<Arc<FakeGoogle>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant = form.get("grant_type").map(String::as_str);
    match grant {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good-code") => {
            Json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 3600,
                "token_type": "Bearer"
            }))
            .into_response()
        }
        Some("refresh_token") if google.refresh_succeeds.load(Ordering::SeqCst) => {
            Json(json!({ "access_token": "access-2", "expires_in": 3600 })).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
    }
}

async fn fake_userinfo(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer access-"));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    Json(json!({ "email": "asha@example.org", "name": "Asha" })).into_response()
}

async fn fake_read_values(
    State(google): State<Arc<FakeGoogle>>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
) -> Response {
    google.reads.fetch_add(1, Ordering::SeqCst);
    if spreadsheet_id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "message": "Requested entity was not found." } })),
        )
            .into_response();
    }
    let rows = google.sheet_rows.lock().unwrap().clone();
    Json(json!({ "range": range, "majorDimension": "ROWS", "values": rows })).into_response()
}

async fn fake_write_values(
    State(google): State<Arc<FakeGoogle>>,
    Path((_spreadsheet_id, range)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let cells: usize = body["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|r| r.as_array().map_or(0, |cells| cells.len()))
                .sum()
        })
        .unwrap_or(0);
    google.writes.lock().unwrap().push((range, body));
    Json(json!({ "updatedCells": cells }))
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    google: Arc<FakeGoogle>,
    sessions: SessionCipher,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let google = Arc::new(FakeGoogle::new());
        let google_app = Router::new()
            .route("/token", post(fake_token))
            .route("/userinfo", get(fake_userinfo))
            .route(
                "/v4/spreadsheets/{id}/values/{range}",
                get(fake_read_values).put(fake_write_values),
            )
            .with_state(google.clone());
        let google_url = spawn(google_app).await;

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            secret_key: Some(SECRET.to_string()),
            cors_origins: vec!["*".to_string()],
            google: GoogleConfig {
                client_id: "client-123".to_string(),
                client_secret: "shh".to_string(),
                redirect_uri: "http://localhost:8001/api/auth/google/callback".to_string(),
                auth_uri: format!("{google_url}/auth"),
                token_uri: format!("{google_url}/token"),
                userinfo_uri: format!("{google_url}/userinfo"),
                sheets_base_url: google_url.clone(),
            },
            strict_join_dates: false,
        };

        let http = Client::new();
        let sessions = SessionCipher::from_secret(SECRET);
        let state = AppState {
            repo: repo.clone(),
            oauth: GoogleOAuth::new(http.clone(), config.google.clone()),
            config: Arc::new(config),
            http,
            sessions: sessions.clone(),
        };

        let base_url = spawn(create_router(state)).await;

        // Wait for both servers to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            google,
            sessions,
            repo,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Session token for credentials expiring after `lifetime`.
    fn token(&self, lifetime: Duration, refresh_token: Option<&str>) -> String {
        self.sessions
            .seal(&GoogleCredentials {
                access_token: "access-1".to_string(),
                refresh_token: refresh_token.map(str::to_string),
                expires_at: Utc::now() + lifetime,
                scopes: vec![],
            })
            .unwrap()
    }

    fn valid_token(&self) -> String {
        self.token(Duration::hours(1), Some("refresh-1"))
    }

    async fn import(&self) -> reqwest::Response {
        self.client
            .post(self.url("/api/members/import?spreadsheet_id=sheet-1"))
            .bearer_auth(self.valid_token())
            .send()
            .await
            .unwrap()
    }

    async fn create_renewal(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/renewals"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "GET {path}");
        resp.json().await.unwrap()
    }
}

fn renewal(number: &str, date: chrono::NaiveDate, amount: Option<f64>) -> Value {
    json!({
        "trade_union_number": number,
        "renewal_date": date.format("%Y-%m-%d").to_string(),
        "receipt_number": format!("R-{number}-{date}"),
        "coordinator_name": "Meena Kumari",
        "amount": amount,
    })
}

// ==================== SYSTEM ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let body = fixture.get_json("/api/health").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_service_banner() {
    let fixture = TestFixture::new().await;

    let body = fixture.get_json("/api").await;
    assert_eq!(body["data"]["message"], "Trade Union MIS API");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

// ==================== AUTH ====================

#[tokio::test]
async fn test_login_returns_authorization_url() {
    let fixture = TestFixture::new().await;

    let body = fixture.get_json("/api/auth/login").await;
    let url = body["data"]["authorization_url"].as_str().unwrap();
    let state = body["data"]["state"].as_str().unwrap();

    assert!(url.contains("/auth?"));
    assert!(url.contains("client_id=client-123"));
    assert!(url.contains("access_type=offline"));
    assert!(fixture.sessions.verify_state(state));
}

#[tokio::test]
async fn test_callback_issues_session_token() {
    let fixture = TestFixture::new().await;

    let login = fixture.get_json("/api/auth/login").await;
    let state = login["data"]["state"].as_str().unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/google/callback"))
        .query(&[("code", "good-code"), ("state", state)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let cookie = resp.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("tu_session="));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "success");
    assert_eq!(body["data"]["user_info"]["email"], "asha@example.org");
    let token = body["data"]["session_token"].as_str().unwrap();

    let credentials = fixture.sessions.open(token).unwrap();
    assert_eq!(credentials.access_token, "access-1");
    assert_eq!(credentials.refresh_token.as_deref(), Some("refresh-1"));

    // Bearer token
    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Asha");

    // Cookie
    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .header("cookie", format!("tu_session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_callback_rejects_forged_state() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/google/callback"))
        .query(&[("code", "good-code"), ("state", "nonce.forged")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_callback_with_bad_code_is_external_failure() {
    let fixture = TestFixture::new().await;
    let state = fixture.sessions.issue_state().unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/google/callback"))
        .query(&[("code", "bad-code"), ("state", state.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("invalid_grant"));
}

#[tokio::test]
async fn test_user_info_requires_authentication() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Authentication required");

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Authentication required");

    // Sealed with a different secret
    let foreign = SessionCipher::from_secret("other-secret")
        .seal(&GoogleCredentials {
            access_token: "access-1".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
            scopes: vec![],
        })
        .unwrap();
    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .bearer_auth(foreign)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Authentication required");
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let fixture = TestFixture::new().await;
    let expired = fixture.token(Duration::seconds(-10), Some("refresh-1"));

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let reissued = resp.headers()["x-session-token"].to_str().unwrap();
    let credentials = fixture.sessions.open(reissued).unwrap();
    assert_eq!(credentials.access_token, "access-2");
    assert_eq!(credentials.refresh_token.as_deref(), Some("refresh-1"));
    assert!(credentials.is_valid_at(Utc::now()));
}

#[tokio::test]
async fn test_refresh_failure_is_unauthorized() {
    let fixture = TestFixture::new().await;
    fixture.google.refresh_succeeds.store(false, Ordering::SeqCst);
    let expired = fixture.token(Duration::seconds(30), Some("refresh-1"));

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Token refresh failed");
}

#[tokio::test]
async fn test_expired_token_without_refresh_token() {
    let fixture = TestFixture::new().await;
    let expired = fixture.token(Duration::seconds(-10), None);

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/user-info"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let cookie = resp.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.contains("Max-Age=0"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["message"], "Logged out successfully");
}

// ==================== IMPORT ====================

#[tokio::test]
async fn test_import_requires_authentication() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/members/import?spreadsheet_id=sheet-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    assert_eq!(fixture.google.reads.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.repo.count_members(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_import_members() {
    let fixture = TestFixture::new().await;

    let resp = fixture.import().await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["imported_count"], 2);
    assert_eq!(body["data"]["total_found"], 2);
    assert_eq!(body["data"]["rejected_rows"], 1);
    assert_eq!(body["data"]["failed_count"], 0);

    let members = fixture.get_json("/api/members").await;
    let members = members["data"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["member_name"], "Asha");
    assert_eq!(members[0]["trade_union_number"], "TU100");
    assert_eq!(members[0]["age"], 34);
    assert_eq!(members[0]["monthly_salary"], 9000.0);
    assert_eq!(members[0]["children_studying"], 0);
    assert_eq!(members[0]["is_active"], true);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let fixture = TestFixture::new().await;

    assert_eq!(fixture.import().await.status(), 200);
    let first = fixture.get_json("/api/members?active_only=false").await;

    assert_eq!(fixture.import().await.status(), 200);
    let second = fixture.get_json("/api/members?active_only=false").await;

    let first = first["data"].as_array().unwrap();
    let second = second["data"].as_array().unwrap();
    assert_eq!(first.len(), second.len());
    for (before, after) in first.iter().zip(second) {
        assert_eq!(before["id"], after["id"]);
        assert_eq!(before["member_name"], after["member_name"]);
        assert_eq!(before["age"], after["age"]);
        assert_eq!(before["state"], after["state"]);
        assert_eq!(before["date_joining"], after["date_joining"]);
    }
}

#[tokio::test]
async fn test_import_unknown_spreadsheet() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/members/import?spreadsheet_id=missing"))
        .bearer_auth(fixture.valid_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Requested entity was not found"));
}

#[tokio::test]
async fn test_import_requires_spreadsheet_id() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/members/import"))
        .bearer_auth(fixture.valid_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(fixture.google.reads.load(Ordering::SeqCst), 0);
}

// ==================== MEMBERS ====================

#[tokio::test]
async fn test_member_search_and_filters() {
    let fixture = TestFixture::new().await;
    fixture.import().await;

    let body = fixture.get_json("/api/members?search=bin").await;
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["trade_union_number"], "TU101");

    let body = fixture.get_json("/api/members?state=Kerala").await;
    assert_eq!(body["data"][0]["member_name"], "Asha");

    let body = fixture.get_json("/api/members?search=%25").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let body = fixture.get_json("/api/members?skip=1&limit=1").await;
    let page = body["data"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["member_name"], "Bina");
}

#[tokio::test]
async fn test_get_member_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/members/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_replace_member() {
    let fixture = TestFixture::new().await;
    fixture.import().await;

    let body = fixture.get_json("/api/members?search=TU100").await;
    let mut member = body["data"][0].clone();
    let id = member["id"].as_str().unwrap().to_string();

    // Out-of-range age is rejected with the field named
    member["age"] = json!(12);
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/members/{id}")))
        .json(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "age");

    // Deactivation through a full replace
    member["age"] = json!(35);
    member["is_active"] = json!(false);
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/members/{id}")))
        .json(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["age"], 35);
    assert_eq!(body["data"]["is_active"], false);

    let active = fixture.get_json("/api/members").await;
    assert_eq!(active["data"].as_array().unwrap().len(), 1);
    let all = fixture.get_json("/api/members?active_only=false").await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let resp = fixture
        .client
        .put(fixture.url("/api/members/does-not-exist"))
        .json(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_replace_with_taken_union_number_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.import().await;

    let body = fixture.get_json("/api/members?search=TU100").await;
    let mut member = body["data"][0].clone();
    let id = member["id"].as_str().unwrap().to_string();
    member["trade_union_number"] = json!("TU101");

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/members/{id}")))
        .json(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

// ==================== RENEWALS ====================

#[tokio::test]
async fn test_create_renewal_updates_member() {
    let fixture = TestFixture::new().await;
    fixture.import().await;
    let today = Utc::now().date_naive();

    let resp = fixture
        .create_renewal(renewal("TU100", today, Some(250.0)))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["trade_union_number"], "TU100");

    let member = fixture.get_json("/api/members?search=TU100").await;
    assert_eq!(
        member["data"][0]["last_renewal"],
        today.format("%Y-%m-%d").to_string()
    );
}

#[tokio::test]
async fn test_create_renewal_for_unknown_member() {
    let fixture = TestFixture::new().await;
    fixture.import().await;

    let resp = fixture
        .create_renewal(renewal("TU999", Utc::now().date_naive(), None))
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "Member not found with this trade union number"
    );

    let listed = fixture.get_json("/api/renewals").await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_renewal_validation() {
    let fixture = TestFixture::new().await;
    fixture.import().await;

    let mut body = renewal("TU100", Utc::now().date_naive(), Some(-5.0));
    let resp = fixture.create_renewal(body.clone()).await;
    assert_eq!(resp.status(), 400);

    body["amount"] = json!(10.0);
    body["receipt_number"] = json!("");
    let resp = fixture.create_renewal(body).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["details"]["field"], "receipt_number");
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let fixture = TestFixture::new().await;
    fixture.import().await;

    let mut body = renewal("TU100", Utc::now().date_naive(), None);
    body.as_object_mut().unwrap().remove("renewal_date");
    let resp = fixture.create_renewal(body).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "renewal_date");

    let resp = fixture
        .client
        .post(fixture.url("/api/renewals"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let resp = fixture
        .client
        .get(fixture.url("/api/members?limit=many"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("query string"));
}

#[tokio::test]
async fn test_list_renewals_newest_first() {
    let fixture = TestFixture::new().await;
    fixture.import().await;
    let today = Utc::now().date_naive();
    let earlier = today.checked_sub_months(Months::new(2)).unwrap();

    fixture.create_renewal(renewal("TU100", earlier, None)).await;
    fixture.create_renewal(renewal("TU101", today, None)).await;

    let body = fixture.get_json("/api/renewals").await;
    let renewals = body["data"].as_array().unwrap();
    assert_eq!(renewals.len(), 2);
    assert_eq!(renewals[0]["trade_union_number"], "TU101");
    assert_eq!(renewals[1]["trade_union_number"], "TU100");

    let body = fixture.get_json("/api/renewals?trade_union_number=TU100").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body = fixture.get_json("/api/renewals?coordinator=meena").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_export_renewals() {
    let fixture = TestFixture::new().await;
    fixture.import().await;
    let today = Utc::now().date_naive();
    fixture.create_renewal(renewal("TU100", today, Some(100.0))).await;
    fixture.create_renewal(renewal("TU101", today, None)).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/renewals/export?spreadsheet_id=sheet-1"))
        .bearer_auth(fixture.valid_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["exported_count"], 2);
    assert_eq!(body["data"]["updated_cells"], 12);

    let writes = fixture.google.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let (range, sent) = &writes[0];
    assert_eq!(range, "Renewals!A:D");
    assert_eq!(sent["values"][0][0], "Trade Union Number");
    assert_eq!(sent["values"][1][0], "TU100");
    assert_eq!(sent["values"][1][1], today.format("%Y-%m-%d").to_string());
}

#[tokio::test]
async fn test_export_requires_authentication() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/renewals/export?spreadsheet_id=sheet-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(fixture.google.writes.lock().unwrap().is_empty());
}

// ==================== DASHBOARD ====================

#[tokio::test]
async fn test_dashboard_stats() {
    let fixture = TestFixture::new().await;
    fixture.import().await;
    let today = Utc::now().date_naive();
    let long_ago = today.checked_sub_months(Months::new(13)).unwrap();

    fixture.create_renewal(renewal("TU100", long_ago, Some(500.0))).await;
    fixture.create_renewal(renewal("TU101", today, Some(100.0))).await;
    fixture.create_renewal(renewal("TU101", today, None)).await;

    let body = fixture.get_json("/api/dashboard/stats").await;
    let stats = &body["data"];

    assert_eq!(stats["total_members"], 2);
    assert_eq!(stats["active_members"], 2);
    assert_eq!(stats["inactive_members"], 0);
    assert_eq!(stats["renewals_this_month"], 2);
    assert_eq!(stats["renewals_pending"], 1);
    assert_eq!(stats["total_revenue"], 600.0);
    assert_eq!(stats["avg_monthly_salary"], 8000.0);
    assert_eq!(stats["members_by_state"]["Kerala"], 1);
    assert_eq!(stats["members_by_work_type"]["Cleaning"], 1);

    let trends = stats["renewal_trends"].as_array().unwrap();
    assert_eq!(trends.len(), 6);
    assert_eq!(trends[5]["month"], today.format("%Y-%m").to_string());
    assert_eq!(trends[5]["count"], 2);
}

#[tokio::test]
async fn test_dashboard_on_empty_store() {
    let fixture = TestFixture::new().await;

    let body = fixture.get_json("/api/dashboard/stats").await;
    let stats = &body["data"];
    assert_eq!(stats["total_members"], 0);
    assert_eq!(stats["total_revenue"], 0.0);
    assert_eq!(stats["avg_monthly_salary"], 0.0);
    assert_eq!(stats["members_by_state"], json!({}));
}
