//! End-to-end tests for the journey HTTP surface, driven through the router
//! with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use wreckshop_api::{build_router, AppState};
use wreckshop_core::config::{ApiConfig, JourneyConfig};
use wreckshop_journey::{
    Journey, JourneyEngine, JourneyFilter, JourneyStore, Revision, StoreError, StoreResult,
};

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let engine = JourneyEngine::in_memory(&JourneyConfig::default());
        Self::with_engine(engine)
    }

    fn with_engine(engine: JourneyEngine) -> Self {
        let state = AppState::new(Arc::new(engine), "wreckshop-test");
        Self {
            router: build_router(state, &ApiConfig::default()),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
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

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(request(method, uri, body, None)).await
    }

    async fn create(&self, body: Value) -> Value {
        let (status, body) = self.call("POST", "/api/journeys", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        assert_eq!(body["ok"], true);
        body["data"].clone()
    }
}

fn request(method: &str, uri: &str, body: Option<Value>, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn welcome_series() -> Value {
    json!({
        "name": "Welcome Series",
        "steps": [{"id": "t1", "type": "trigger"}]
    })
}

// ─── Lifecycle scenarios ─────────────────────────────────────────────────

#[tokio::test]
async fn publish_without_segment_is_rejected_then_succeeds_after_patch() {
    let app = TestApp::new();
    let journey = app.create(welcome_series()).await;
    assert_eq!(journey["status"], "draft");
    let id = journey["id"].as_str().unwrap();

    let (status, body) = app
        .call("POST", &format!("/api/journeys/{}/publish", id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("target segment"));

    let (status, body) = app
        .call(
            "PATCH",
            &format!("/api/journeys/{}", id),
            Some(json!({"segmentId": "seg_1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["segmentId"], "seg_1");
    assert_eq!(body["data"]["name"], "Welcome Series");

    let (status, body) = app
        .call("POST", &format!("/api/journeys/{}/publish", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn publish_without_trigger_names_trigger() {
    let app = TestApp::new();
    let journey = app
        .create(json!({"name": "No trigger", "segmentId": "seg_1"}))
        .await;
    let (status, body) = app
        .call(
            "POST",
            &format!("/api/journeys/{}/publish", journey["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Journey must include a trigger step");
}

#[tokio::test]
async fn active_journey_rejects_edits_and_pause_cycle_guards_state() {
    let app = TestApp::new();
    let mut body = welcome_series();
    body["segmentId"] = json!("seg_1");
    let journey = app.create(body).await;
    let id = journey["id"].as_str().unwrap();
    let path = |action: &str| format!("/api/journeys/{}/{}", id, action);

    let (status, _) = app.call("POST", &path("publish"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call("PATCH", &format!("/api/journeys/{}", id), Some(json!({"name": "x"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Only draft journeys can be edited");

    let (status, body) = app.call("POST", &path("pause"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paused");

    let (status, body) = app.call("POST", &path("resume"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = app.call("POST", &path("pause"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.call("POST", &path("pause"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Only active journeys can be paused");

    let (status, _) = app.call("POST", &path("publish"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn resume_of_draft_conflicts() {
    let app = TestApp::new();
    let journey = app.create(welcome_series()).await;
    let (status, body) = app
        .call(
            "POST",
            &format!("/api/journeys/{}/resume", journey["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Only paused journeys can be resumed");
}

// ─── CRUD ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trips() {
    let app = TestApp::new();
    let created = app
        .create(json!({
            "name": "Drop Day",
            "description": "Release-day blast",
            "triggerKey": "release",
            "tags": ["release", "release", " email "],
            "steps": [
                {"id": "t1", "type": "trigger", "config": {"event": "release"}, "next": [{"to": "d1"}]},
                {"id": "d1", "type": "delay", "config": {"amount": 1, "unit": "days"}, "next": [{"to": "e1", "label": "after"}]},
                {"id": "e1", "type": "email", "config": {"subject": "Out now"}, "position": {"x": 10.0, "y": 20.0}}
            ]
        }))
        .await;

    assert_eq!(created["tags"], json!(["release", "email"]));
    assert_eq!(created["steps"][1]["config"]["unit"], "days");
    assert_eq!(created["metrics"], json!([]));

    let (status, body) = app
        .call("GET", &format!("/api/journeys/{}", created["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], created);
}

#[tokio::test]
async fn validation_failures_list_every_field() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            "POST",
            "/api/journeys",
            Some(json!({
                "status": "archived",
                "steps": [
                    {"id": "t1", "type": "teleport"},
                    {"id": "e1", "type": "email", "next": [{"to": "nowhere"}]}
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    let fields = &body["error"]["fieldErrors"];
    assert!(fields["name"].is_array());
    assert!(fields["status"].is_array());
    assert!(fields["steps[0].type"].is_array());
    assert!(fields["steps[1].next[0].to"].is_array());
    assert!(body["error"]["formErrors"].is_array());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/journeys")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrongly_typed_fields_are_listed_field_by_field() {
    let app = TestApp::new();
    let mistyped = json!({
        "name": 5,
        "tags": "x",
        "steps": [{"id": 1, "type": "trigger", "next": {}, "position": {"x": "a"}}]
    });

    let (status, body) = app.call("POST", "/api/journeys", Some(mistyped.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    let fields = body["error"]["fieldErrors"].as_object().unwrap();
    let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["name", "steps[0].id", "steps[0].next", "steps[0].position.x", "tags"]
    );
    assert_eq!(fields["name"], json!(["Expected string, received number"]));

    let draft = app.create(welcome_series()).await;
    let uri = format!("/api/journeys/{}", draft["id"].as_str().unwrap());
    let (status, body) = app.call("PATCH", &uri, Some(mistyped)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = body["error"]["fieldErrors"].as_object().unwrap();
    assert_eq!(fields.len(), 5, "{}", body);
    assert_eq!(fields["tags"], json!(["Expected array, received string"]));

    // Nothing was applied.
    let (_, body) = app.call("GET", &uri, None).await;
    assert_eq!(body["data"]["name"], "Welcome Series");
}

#[tokio::test]
async fn non_object_body_is_a_form_error() {
    let app = TestApp::new();
    let (status, body) = app
        .call("POST", "/api/journeys", Some(json!(["Welcome Series"])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["formErrors"],
        json!(["Expected object, received array"])
    );
}

#[tokio::test]
async fn malformed_patch_on_active_journey_reports_conflict_first() {
    let app = TestApp::new();
    let mut body = welcome_series();
    body["status"] = json!("active");
    body["segmentId"] = json!("seg_1");
    let journey = app.create(body).await;
    assert_eq!(journey["status"], "active");

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/api/journeys/{}", journey["id"].as_str().unwrap()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let app = TestApp::new();
    for uri in [
        format!("/api/journeys/{}", Uuid::new_v4()),
        "/api/journeys/not-a-uuid".to_string(),
        format!("/api/journeys/{}/funnel", Uuid::new_v4()),
    ] {
        let (status, body) = app.call("GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, json!({"ok": false, "error": "not found"}));
    }

    for action in ["publish", "pause", "resume", "duplicate"] {
        let (status, _) = app
            .call("POST", &format!("/api/journeys/{}/{}", Uuid::new_v4(), action), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", action);
    }

    let (status, _) = app
        .call(
            "PATCH",
            &format!("/api/journeys/{}", Uuid::new_v4()),
            Some(json!({"name": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_name_and_status() {
    let app = TestApp::new();
    app.create(json!({"name": "Album Launch"})).await;
    app.create(json!({"name": "launch party"})).await;
    let mut live = welcome_series();
    live["name"] = json!("Merch Store");
    live["segmentId"] = json!("seg_1");
    live["status"] = json!("active");
    app.create(live).await;

    let (status, body) = app.call("GET", "/api/journeys?q=LAUNCH", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| n.to_lowercase().contains("launch")));

    let (_, body) = app.call("GET", "/api/journeys?status=active", None).await;
    let active = body["data"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["status"], "active");

    let (status, body) = app.call("GET", "/api/journeys?status=archived", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (_, body) = app.call("GET", "/api/journeys", None).await;
    let all = body["data"].as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["name"], "Merch Store");
}

#[tokio::test]
async fn duplicate_creates_a_clean_draft() {
    let app = TestApp::new();
    let mut body = welcome_series();
    body["segmentId"] = json!("seg_1");
    body["status"] = json!("active");
    body["tags"] = json!(["onboarding"]);
    let source = app.create(body).await;

    let (status, body) = app
        .call(
            "POST",
            &format!("/api/journeys/{}/duplicate", source["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let copy = &body["data"];
    assert_ne!(copy["id"], source["id"]);
    assert_eq!(copy["name"], "Welcome Series (Copy)");
    assert_eq!(copy["status"], "draft");
    assert_eq!(copy["metrics"], json!([]));
    assert_eq!(copy["steps"], source["steps"]);
    assert_eq!(copy["tags"], source["tags"]);
    assert_eq!(copy["segmentId"], "seg_1");
}

#[tokio::test]
async fn delete_removes_in_any_status() {
    let app = TestApp::new();
    let mut body = welcome_series();
    body["segmentId"] = json!("seg_1");
    body["status"] = json!("paused");
    let journey = app.create(body).await;
    let uri = format!("/api/journeys/{}", journey["id"].as_str().unwrap());

    let (status, body) = app.call("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, _) = app.call("GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Identity, audit and funnel ──────────────────────────────────────────

#[tokio::test]
async fn audit_trail_records_actor_and_outlives_journey() {
    let app = TestApp::new();
    let (status, body) = app
        .send(request(
            "POST",
            "/api/journeys",
            Some(json!({"name": "Owned", "segmentId": "seg_1", "steps": [{"id": "t1", "type": "trigger"}]})),
            Some("prof_77"),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ownerProfileId"], "prof_77");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    app.send(request("POST", &format!("/api/journeys/{}/publish", id), None, Some("prof_88")))
        .await;
    app.call("DELETE", &format!("/api/journeys/{}", id), None).await;

    let (status, body) = app
        .call("GET", &format!("/api/journeys/{}/audit", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let trail = body["data"].as_array().unwrap();
    let actions: Vec<&str> = trail.iter().map(|e| e["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["create", "publish", "delete"]);
    assert_eq!(trail[0]["actor"], "prof_77");
    assert_eq!(trail[1]["actor"], "prof_88");
    assert_eq!(trail[1]["fromStatus"], "draft");
    assert_eq!(trail[1]["toStatus"], "active");
    assert_eq!(trail[2]["actor"], "anonymous");

    let (status, body) = app.call("GET", "/api/journeys/whatever/audit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn funnel_reports_zeroes_for_fresh_journey() {
    let app = TestApp::new();
    let journey = app
        .create(json!({
            "name": "Funnel",
            "steps": [
                {"id": "t1", "type": "trigger", "next": [{"to": "x1"}]},
                {"id": "x1", "type": "exit"}
            ]
        }))
        .await;
    let (status, body) = app
        .call(
            "GET",
            &format!("/api/journeys/{}/funnel", journey["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalEntered"], 0);
    assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["steps"][1]["type"], "exit");
    assert_eq!(body["data"]["steps"][1]["completionRate"], 0.0);
}

// ─── Operational endpoints ───────────────────────────────────────────────

#[tokio::test]
async fn health_and_probe_endpoints_answer() {
    let app = TestApp::new();
    for uri in ["/health", "/api/health", "/api/ping"] {
        let (status, body) = app.call("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["ok"], true, "{}", uri);
    }
    for uri in ["/ready", "/live"] {
        let (status, _) = app.call("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }

    let (status, body) = app.call("GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/journeys"].is_object());
}

#[tokio::test]
async fn empty_prefix_mounts_journeys_at_root() {
    let engine = JourneyEngine::in_memory(&JourneyConfig::default());
    let config = ApiConfig {
        path_prefix: String::new(),
        ..ApiConfig::default()
    };
    let app = TestApp {
        router: build_router(AppState::new(Arc::new(engine), "wreckshop-test"), &config),
    };
    let (status, body) = app.call("GET", "/journeys", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

// ─── Store failures ──────────────────────────────────────────────────────

/// A backend that is down.
struct FailingStore;

impl FailingStore {
    fn down<T>() -> StoreResult<T> {
        Err(StoreError::Backend("database unavailable".into()))
    }
}

impl JourneyStore for FailingStore {
    fn insert(&self, _journey: Journey) -> StoreResult<Journey> {
        Self::down()
    }

    fn get(&self, _id: Uuid) -> StoreResult<Option<Journey>> {
        Self::down()
    }

    fn list(&self, _filter: &JourneyFilter) -> StoreResult<Vec<Journey>> {
        Self::down()
    }

    fn replace(&self, _next: Journey, _expected: Revision) -> StoreResult<Journey> {
        Self::down()
    }

    fn remove(&self, _id: Uuid) -> StoreResult<Option<Journey>> {
        Self::down()
    }
}

#[tokio::test]
async fn store_failures_surface_as_500_with_raw_message() {
    let engine = JourneyEngine::new(Arc::new(FailingStore), &JourneyConfig::default());
    let app = TestApp::with_engine(engine);

    let (status, body) = app.call("GET", "/api/journeys", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"ok": false, "error": "database unavailable"}));

    let (status, _) = app.call("POST", "/api/journeys", Some(welcome_series())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app.call("GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
