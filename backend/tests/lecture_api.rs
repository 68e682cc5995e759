mod support;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use support::{TestApp, LAT_300M};

fn create_body(app: &TestApp) -> Value {
    json!({
        "group_id": app.group_id,
        "title": "Operating Systems",
        "lat": 0.0,
        "lon": 0.0,
        "duration_minutes": 90
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/lectures", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn teacher_creates_lists_and_reads_lecture() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");

    let (status, created) = app
        .send(Method::POST, "/api/lectures", Some(&teacher), Some(create_body(&app)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["state"], "active");
    assert_eq!(created["join_radius_m"], 5000.0);
    assert_eq!(created["presence_radius_m"], 200.0);
    assert!(created.get("passcode").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = app
        .send(Method::GET, "/api/lectures", Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, fetched) = app
        .send(Method::GET, &format!("/api/lectures/{}", id), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Operating Systems");
    assert_eq!(fetched["anchor"]["lat"], 0.0);
}

#[tokio::test]
async fn student_cannot_create_lecture() {
    let app = TestApp::new();
    let student = app.student("ada");
    let (status, body) = app
        .send(Method::POST, "/api/lectures", Some(&student), Some(create_body(&app)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn invalid_coordinates_fail_validation() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let mut body = create_body(&app);
    body["lat"] = json!(123.0);
    let (status, body) = app
        .send(Method::POST, "/api/lectures", Some(&teacher), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["errors"][0], "lat: range");
}

#[tokio::test]
async fn malformed_lecture_id_is_bad_request() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let (status, body) = app
        .send(Method::GET, "/api/lectures/not-a-uuid", Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn lifecycle_edit_end_delete() {
    let app = TestApp::new();
    let teacher = app.teacher("turing");
    let student = app.student("ada");
    let (_, created) = app
        .send(Method::POST, "/api/lectures", Some(&teacher), Some(create_body(&app)))
        .await;
    let id = created["id"].as_str().unwrap().to_string();
    let lecture_uri = format!("/api/lectures/{}", id);

    let (status, updated) = app
        .send(
            Method::PUT,
            &lecture_uri,
            Some(&teacher),
            Some(json!({ "title": "Operating Systems II", "lat": 45.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Operating Systems II");
    assert_eq!(updated["anchor"]["lat"], 0.0);

    let (status, body) = app
        .send(Method::DELETE, &lecture_uri, Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, _) = app
        .send(
            Method::POST,
            &format!("{}/join", lecture_uri),
            Some(&student),
            Some(json!({ "lat": LAT_300M, "lon": 0.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(
            Method::POST,
            &format!("{}/ping", lecture_uri),
            Some(&student),
            Some(json!({ "lat": 0.0, "lon": 0.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, ended) = app
        .send(Method::POST, &format!("{}/end", lecture_uri), Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["state"], "ended");

    let (status, body) = app
        .send(Method::POST, &format!("{}/end", lecture_uri), Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, _) = app
        .send(
            Method::PUT,
            &lecture_uri,
            Some(&teacher),
            Some(json!({ "duration_minutes": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::DELETE, &lecture_uri, Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.ping_log_len(), 0);

    let (status, _) = app
        .send(Method::GET, &lecture_uri, Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_teacher_cannot_end_lecture() {
    let app = TestApp::new();
    let owner = app.teacher("turing");
    let other = app.teacher("hopper");
    let (_, created) = app
        .send(Method::POST, "/api/lectures", Some(&owner), Some(create_body(&app)))
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/lectures/{}/end", id),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn openapi_document_lists_presence_routes() {
    let app = TestApp::new();
    let (status, doc) = app
        .send(Method::GET, "/api/docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/lectures/{id}/join"]["post"].is_object());
    assert!(doc["paths"]["/api/lectures/{id}/passcode"]["get"].is_object());
}
