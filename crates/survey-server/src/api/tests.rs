use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, state::AppState};

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory());
    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn mission_body(drone_id: Option<&str>) -> Value {
    json!({
        "name": "North field",
        "surveyArea": {
            "type": "Polygon",
            "coordinates": [[
                [-117.80, 33.60],
                [-117.79, 33.60],
                [-117.79, 33.61],
                [-117.80, 33.61],
                [-117.80, 33.60]
            ]]
        },
        "parameters": {"altitude": 100, "speed": 15, "overlap": 75, "pattern": "crosshatch"},
        "schedule": {"startTime": Utc::now().to_rfc3339(), "isRecurring": false},
        "assignedDrone": drone_id
    })
}

async fn create_drone(app: &axum::Router, serial: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/drones",
            json!({"name": "Scout", "serialNumber": serial, "batteryLevel": 90}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    read_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn mission_lifecycle_over_http() {
    let (app, _state) = setup_app();
    let drone_id = create_drone(&app, "SN-100").await;

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/missions", mission_body(Some(&drone_id))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(res.headers().contains_key("x-request-id"));
    let mission = read_json(res).await;
    assert_eq!(mission["status"], "in-progress");
    let mission_id = mission["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(get(&format!("/api/drones/{drone_id}")))
        .await
        .unwrap();
    assert_eq!(read_json(res).await["status"], "in-mission");

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/missions/{mission_id}/progress"),
            json!({"progress": 100}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let done = read_json(res).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["eta"], 0.0);

    let res = app
        .clone()
        .oneshot(get(&format!("/api/drones/{drone_id}")))
        .await
        .unwrap();
    assert_eq!(read_json(res).await["status"], "available");

    let res = app
        .clone()
        .oneshot(get("/api/missions?status=completed"))
        .await
        .unwrap();
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unavailable_drone_is_conflict() {
    let (app, _state) = setup_app();
    let drone_id = create_drone(&app, "SN-200").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/drones/{drone_id}/status"),
            json!({"status": "charging"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/missions", mission_body(Some(&drone_id))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert!(read_json(res).await["error"].is_string());

    let res = app.clone().oneshot(get("/api/missions")).await.unwrap();
    assert!(read_json(res).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn control_rejects_illegal_transition() {
    let (app, _state) = setup_app();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/missions", mission_body(None)))
        .await
        .unwrap();
    let mission_id = read_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/missions/{mission_id}/control"),
            json!({"action": "pause"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/missions/{mission_id}/control"),
            json!({"action": "abort"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["status"], "aborted");
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let (app, _state) = setup_app();

    let mut open_ring = mission_body(None);
    open_ring["surveyArea"]["coordinates"] = json!([[[0, 0], [1, 0], [1, 1], [0, 1]]]);
    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/missions", open_ring))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["field"], "surveyArea.coordinates");

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/drones", json!({"name": "No serial"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(get("/api/drones?status=flying"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let (app, _state) = setup_app();

    for uri in ["/api/drones/ghost", "/api/missions/ghost", "/api/reports/ghost"] {
        let res = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/reports",
            json!({"missionId": "ghost", "images": ["a.jpg"]}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_and_reports() {
    let (app, _state) = setup_app();
    create_drone(&app, "SN-300").await;

    let res = app.clone().oneshot(get("/api/drones/stats")).await.unwrap();
    let stats = read_json(res).await;
    assert_eq!(stats[0]["status"], "available");
    assert_eq!(stats[0]["count"], 1);
    assert_eq!(stats[0]["avgBattery"], 90.0);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/missions", mission_body(None)))
        .await
        .unwrap();
    let mission_id = read_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/reports",
            json!({"missionId": mission_id, "images": ["a.jpg"]}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let report = read_json(res).await;
    assert!(report["flightStats"]["distance"].as_f64().unwrap() > 0.0);

    let res = app
        .clone()
        .oneshot(get(&format!("/api/reports?missionId={mission_id}")))
        .await
        .unwrap();
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 1);

    let res = app.clone().oneshot(get("/api/missions/stats")).await.unwrap();
    let stats = read_json(res).await;
    assert_eq!(stats[0]["status"], "planned");
    assert!(stats[0]["avgETA"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn delete_endpoints() {
    let (app, _state) = setup_app();
    let drone_id = create_drone(&app, "SN-400").await;

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/drones/{drone_id}"))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
