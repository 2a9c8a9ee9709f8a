//! Router-level tests over the in-memory store.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use mauri_common::{Config, FacetSet, NewPest};
use mauri_db::Database;
use mauri_web::router::build_router;
use mauri_web::state::AppState;
use mauri_web::storage::{PhotoStore, StorageError, StoredPhoto};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const OWNER: &str = "owner-1";
const VISITOR: &str = "visitor-7";
const PNG_DOT: &str = "data:image/png;base64,iVBORw0KGgo=";
const LARGE_PHOTO_BYTES: usize = 3 * 1024 * 1024;

#[derive(Default)]
struct RecordingStore {
    keys: Mutex<Vec<String>>,
}

#[async_trait]
impl PhotoStore for RecordingStore {
    async fn put(&self, key: &str, _bytes: Vec<u8>, _mime: &str) -> Result<StoredPhoto, StorageError> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(StoredPhoto { key: key.to_string(), url: format!("https://photos.test/{key}") })
    }
}

struct TestApp {
    router: Router,
    db: Database,
    photos: Arc<RecordingStore>,
}

impl TestApp {
    async fn request(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.request(request).await;
        let value = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
        (status, value)
    }

    async fn html(&self, request: Request<Body>) -> (StatusCode, String) {
        let (status, body) = self.request(request).await;
        (status, String::from_utf8(body).unwrap())
    }
}

fn pest(title: &str, groups: &str, alert: bool, visible: bool) -> NewPest {
    NewPest {
        pest_groups: FacetSet::parse(groups),
        alert,
        visible,
        ..NewPest::new(title)
    }
}

async fn seeded_db() -> Database {
    let db = Database::in_memory();
    let mut gorse = pest("Gorse", "Plants", true, true);
    gorse.latin = Some("Ulex europaeus".into());
    gorse.keywords = Some("yellow, spiny".into());
    db.pests().create(gorse).await.unwrap();
    db.pests().create(pest("Broom", "Plants", false, true)).await.unwrap();
    let mut rabbit = pest("Rabbit", "Animals", false, true);
    rabbit.pinned = true;
    db.pests().create(rabbit).await.unwrap();
    db.pests().create(pest("Secret weed", "Plants", false, false)).await.unwrap();
    db
}

fn config() -> Config {
    let mut config = Config::default();
    config.auth.owner_open_id = Some(OWNER.to_string());
    config
}

async fn app_with(db: Database) -> TestApp {
    app_with_config(db, config()).await
}

async fn app_with_config(db: Database, config: Config) -> TestApp {
    let photos = Arc::new(RecordingStore::default());
    let state = AppState::new(db.clone(), photos.clone(), config).unwrap();
    TestApp { router: build_router(state), db, photos }
}

async fn app() -> TestApp {
    app_with(seeded_db().await).await
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn as_user(mut request: Request<Body>, open_id: &str) -> Request<Body> {
    request.headers_mut().insert("x-forwarded-user", open_id.parse().unwrap());
    request
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn titles(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

/// A JPEG data URL well past axum's default 2 MB body limit once encoded.
fn large_jpeg() -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(vec![0u8; LARGE_PHOTO_BYTES]);
    format!("data:image/jpeg;base64,{payload}")
}

fn form_post(uri: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn observation(pest_id: i64) -> Value {
    json!({
        "pestId": pest_id,
        "pestTitle": "Gorse",
        "location": "Port Hills",
        "observationDate": "2026-03-14",
        "impactWhenua": "high",
        "photos": [PNG_DOT, PNG_DOT],
        "submitterEmail": "kaitiaki@example.org"
    })
}

// ── Public reads ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_excludes_hidden_pests() {
    let app = app().await;
    let (status, body) = app.json(get("/api/pests")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["Broom", "Gorse", "Rabbit"]);
}

#[tokio::test]
async fn test_search_is_subset_and_blank_is_list() {
    let app = app().await;
    let (_, all) = app.json(get("/api/pests")).await;

    let (status, found) = app.json(get("/api/pests/search?query=ULEX")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&found), ["Gorse"]);

    let (_, keyword) = app.json(get("/api/pests/search?query=spiny")).await;
    assert_eq!(titles(&keyword), ["Gorse"]);

    let (_, hidden) = app.json(get("/api/pests/search?query=secret")).await;
    assert!(titles(&hidden).is_empty());

    let (_, blank) = app.json(get("/api/pests/search?query=")).await;
    assert_eq!(blank, all);
}

#[tokio::test]
async fn test_filter_by_group_and_alert() {
    let app = app().await;
    let (_, plants) = app.json(get("/api/pests/filter?group=Plants")).await;
    assert_eq!(titles(&plants), ["Broom", "Gorse"]);

    let (_, both) = app.json(get("/api/pests/filter?group=Plants&group=Animals")).await;
    assert_eq!(titles(&both), ["Broom", "Gorse", "Rabbit"]);

    let (_, alerts) = app.json(get("/api/pests/filter?group=Plants&alert_only=on")).await;
    assert_eq!(titles(&alerts), ["Gorse"]);

    let (_, facets) = app.json(get("/api/pests/facets")).await;
    assert_eq!(facets["groups"], json!(["Animals", "Plants"]));
}

#[tokio::test]
async fn test_get_by_title_is_exact() {
    let app = app().await;
    let (status, body) = app.json(get("/api/pests/by-title/Gorse")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latin"], "Ulex europaeus");

    let (status, body) = app.json(get("/api/pests/by-title/gorse")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = app.json(get("/api/pests/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Access control ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_procedures_refuse_non_admins() {
    let app = app().await;
    let before = app.db.pests().list_all().await.unwrap().len();

    for caller in [None, Some(VISITOR)] {
        let mut request = json_request(Method::POST, "/api/pests", json!({ "title": "Possum" }));
        if let Some(open_id) = caller {
            request = as_user(request, open_id);
        }
        let (status, body) = app.json(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert_eq!(body["error"]["message"], "You do not have required permission");
    }

    let (status, _) = app.json(as_user(get("/api/submissions"), VISITOR)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.json(get("/api/admin/stats")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.json(as_user(get("/api/submissions"), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    assert_eq!(app.db.pests().list_all().await.unwrap().len(), before);
}

#[tokio::test]
async fn test_admin_pest_lifecycle() {
    let app = app().await;
    let create = json_request(Method::POST, "/api/pests", json!({ "title": "Possum", "pest_groups": "Animals" }));
    let (status, body) = app.json(as_user(create, OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = body["id"].as_i64().unwrap();

    let patch = json_request(Method::PATCH, &format!("/api/pests/{id}"), json!({ "data": { "alert": true } }));
    let (status, body) = app.json(as_user(patch, OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);
    assert!(app.db.pests().get_by_id(id).await.unwrap().unwrap().alert);

    let duplicate = json_request(Method::POST, "/api/pests", json!({ "title": "Possum" }));
    let (status, body) = app.json(as_user(duplicate, OWNER)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let delete = || as_user(Request::delete(format!("/api/pests/{id}")).body(Body::empty()).unwrap(), OWNER);
    let (status, body) = app.json(delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);
    let (status, body) = app.json(delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 0);
}

#[tokio::test]
async fn test_me_and_sign_in_cookie() {
    let app = app().await;
    let (status, body) = app.json(get("/api/auth/me")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let response = app.router.clone().oneshot(as_user(get("/api/auth/me"), OWNER)).await.unwrap();
    let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("mauri_session=owner-1"));
    assert!(cookie.contains("HttpOnly"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let me: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(me["open_id"], OWNER);
    assert_eq!(me["role"], "admin");

    let (_, visitor) = app.json(as_user(get("/api/auth/me"), VISITOR)).await;
    assert_eq!(visitor["role"], "user");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = app().await;
    let request = Request::post("/api/auth/logout")
        .header(header::COOKIE, "mauri_session=owner-1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("mauri_session="));
    assert!(cookie.contains("Max-Age=0"));
}

// ── Submissions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_submission_creates_one_row_with_photos() {
    let app = app().await;
    let gorse = app.db.pests().get_by_title("Gorse").await.unwrap().unwrap();

    let mut request = json_request(Method::POST, "/api/submissions", observation(gorse.id));
    request.headers_mut().insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
    request.headers_mut().insert(header::USER_AGENT, "field-app/2".parse().unwrap());
    let (status, body) = app.json(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let rows = app.db.submissions().list().await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, body["id"].as_i64().unwrap());
    assert_eq!(row.pest_id, gorse.id);
    assert_eq!(row.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(row.user_agent.as_deref(), Some("field-app/2"));
    assert_eq!(row.photo_keys.len(), 2);
    assert!(row.photo_keys.iter().all(|k| k.starts_with("submissions/") && k.ends_with(".png")));
    assert_eq!(*app.photos.keys.lock().unwrap(), row.photo_keys);

    let (status, fetched) = app.json(as_user(get(&format!("/api/submissions/{}", row.id)), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["impact_whenua"], "high");
    assert!(fetched["impact_wai"].is_null());
}

#[tokio::test]
async fn test_submission_accepts_photos_over_default_body_limit() {
    let app = app().await;
    let gorse = app.db.pests().get_by_title("Gorse").await.unwrap().unwrap();

    let mut payload = observation(gorse.id);
    payload["photos"] = json!([large_jpeg()]);
    let (status, body) = app.json(json_request(Method::POST, "/api/submissions", payload)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let rows = app.db.submissions().list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].photo_keys.len(), 1);
    assert!(rows[0].photo_keys[0].ends_with(".jpg"));
}

#[tokio::test]
async fn test_pest_page_accepts_large_photo() {
    let app = app().await;
    let body = serde_html_form::to_string([
        ("location", "Port Hills".to_string()),
        ("observation_date", "2026-03-14".to_string()),
        ("photos", large_jpeg()),
    ])
    .unwrap();

    let (status, html) = app.html(form_post("/pest/Gorse/observations", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Your observation of Gorse has been recorded"));
    assert_eq!(app.photos.keys.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_oversized_form_body_stays_in_draft() {
    let mut config = config();
    config.submissions.max_photos = 1;
    config.submissions.max_photo_bytes = 1024;
    let app = app_with_config(seeded_db().await, config).await;

    let body = serde_html_form::to_string([
        ("location", "Port Hills".to_string()),
        ("observation_date", "2026-03-14".to_string()),
        ("photos", large_jpeg()),
    ])
    .unwrap();
    let (status, html) = app.html(form_post("/pest/Gorse/observations", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("notice-error"));
    assert!(html.contains(r#"action="/pest/Gorse/observations""#));
    assert!(app.db.submissions().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_ids_use_error_envelope() {
    let app = app().await;
    let (status, body) = app.json(get("/api/pests/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());

    let (status, body) = app.json(as_user(get("/api/submissions/abc"), OWNER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_invalid_submission_is_rejected() {
    let app = app().await;
    let mut payload = observation(1);
    payload["location"] = json!("   ");
    let (status, body) = app.json(json_request(Method::POST, "/api/submissions", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let malformed = Request::post("/api/submissions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.json(malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    assert_eq!(app.db.submissions().count().await.unwrap(), 0);
    assert!(app.photos.keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submission_delete_is_idempotent() {
    let app = app().await;
    let (_, created) = app.json(json_request(Method::POST, "/api/submissions", observation(1))).await;
    let id = created["id"].as_i64().unwrap();

    let delete = || as_user(Request::delete(format!("/api/submissions/{id}")).body(Body::empty()).unwrap(), OWNER);
    let (status, first) = app.json(delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    let (status, second) = app.json(delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], true);
    assert_eq!(app.db.submissions().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_offline_reads_empty_writes_unavailable() {
    let app = app_with(Database::offline()).await;
    let (status, body) = app.json(get("/api/pests")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app.json(json_request(Method::POST, "/api/submissions", observation(1))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    assert!(app.photos.keys.lock().unwrap().is_empty());

    let (_, health) = app.json(get("/healthz")).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database_configured"], false);
}

#[tokio::test]
async fn test_admin_stats() {
    let app = app().await;
    app.json(json_request(Method::POST, "/api/submissions", observation(1))).await;
    let (status, stats) = app.json(as_user(get("/api/admin/stats"), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats, json!({ "total_pests": 3, "alert_pests": 1, "total_submissions": 1 }));
}

// ── Pages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_home_features_pinned_first() {
    let app = app().await;
    let (status, html) = app.html(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("3 species"));
    let rabbit = html.find("Rabbit").unwrap();
    let broom = html.find("Broom").unwrap();
    assert!(rabbit < broom);
    assert!(!html.contains("Secret weed"));
}

#[tokio::test]
async fn test_search_page_shows_clear_all_when_filtered() {
    let app = app().await;
    let (status, html) = app.html(get("/search")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("3 results"));
    assert!(!html.contains("Clear all"));

    let (_, html) = app.html(get("/search?text=gorse&group=Plants")).await;
    assert!(html.contains("1 result"));
    assert!(html.contains("Clear all"));
}

#[tokio::test]
async fn test_pest_page_submission_flow() {
    let app = app().await;
    let (status, html) = app.html(get("/pest/Gorse")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Ulex europaeus"));
    assert!(html.contains(r#"action="/pest/Gorse/observations""#));

    let form = |body: &str| {
        Request::post("/pest/Gorse/observations")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, html) = app.html(form("location=&observation_date=2026-03-14&notes=near+track")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("location is required"));
    assert!(html.contains("near track"));

    let (status, html) = app
        .html(form("location=Port+Hills&observation_date=2026-03-14&impact_wai=low&impact_whenua="))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Your observation of Gorse has been recorded"));
    assert!(html.contains("Submit another observation"));

    let rows = app.db.submissions().list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pest_title, "Gorse");
}

#[tokio::test]
async fn test_hidden_and_unknown_pests_are_not_found() {
    let app = app().await;
    let (status, _) = app.html(get("/pest/Secret%20weed")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.html(as_user(get("/pest/Secret%20weed"), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, html) = app.html(get("/no/such/page")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn test_admin_pages_gate_and_forms() {
    let app = app().await;
    let (status, html) = app.html(as_user(get("/admin"), VISITOR)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(html.contains("Access denied"));

    let (status, html) = app.html(as_user(get("/admin/pests"), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Secret weed"));
    assert!(html.contains("(1 hidden)"));

    let broom = app.db.pests().get_by_title("Broom").await.unwrap().unwrap();
    let toggle = Request::post(format!("/admin/pests/{}/toggle", broom.id))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("field=visible"))
        .unwrap();
    let (status, _) = app.request(as_user(toggle, OWNER)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(!app.db.pests().get_by_id(broom.id).await.unwrap().unwrap().visible);

    let delete = Request::post(format!("/admin/pests/{}/delete", broom.id)).body(Body::empty()).unwrap();
    let (status, _) = app.request(as_user(delete, VISITOR)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.db.pests().get_by_id(broom.id).await.unwrap().is_some());
}
