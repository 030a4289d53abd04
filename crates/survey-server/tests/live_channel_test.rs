//! Live channel integration tests.
//!
//! Serves the full router on a loopback port and talks to it through the
//! SDK, the same way a ground station would.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use survey_core::{
    CreateDroneRequest, CreateMissionRequest, DroneStatus, FlightParameters, MissionAction,
    MissionStatus, PositionUpdate, Schedule, ServerEvent, SurveyArea, SurveyPattern,
};
use survey_oracle::adapter::CHAT_FAILURE_REPLY;
use survey_sdk::{ApiError, SurveyClient};
use survey_server::{api, state::AppState};
use tokio::time::timeout;

async fn spawn_server() -> (String, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory());
    let app = api::routes().with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn survey_request(drone_id: &str) -> CreateMissionRequest {
    CreateMissionRequest {
        name: "Levee inspection".to_string(),
        survey_area: SurveyArea::from_ring(vec![
            [-121.50, 38.50],
            [-121.49, 38.50],
            [-121.49, 38.51],
            [-121.50, 38.51],
            [-121.50, 38.50],
        ]),
        parameters: FlightParameters {
            altitude: 80.0,
            speed: 12.0,
            overlap: 70.0,
            pattern: SurveyPattern::Parallel,
        },
        schedule: Schedule {
            start_time: Utc::now(),
            end_time: None,
            is_recurring: false,
            frequency: None,
        },
        assigned_drone: Some(drone_id.to_string()),
    }
}

async fn wait_for_group(state: &AppState, mission_id: &str, size: usize) {
    for _ in 0..100 {
        if state.hub().group_size(mission_id) == size {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("mission group {mission_id} never reached {size} observers");
}

#[tokio::test]
async fn test_positions_reach_mission_observers() {
    let (base, state) = spawn_server().await;
    let client = SurveyClient::new(&base);
    assert!(client.health().await.unwrap());

    let drone = client
        .create_drone(&CreateDroneRequest {
            name: "Heron".to_string(),
            serial_number: "HR-1".to_string(),
            status: None,
            battery_level: Some(95.0),
            location: None,
            specifications: None,
        })
        .await
        .unwrap();
    let mission = client.create_mission(&survey_request(&drone.id)).await.unwrap();
    assert_eq!(mission.status, MissionStatus::InProgress);

    let mut watcher = client.connect_channel().await.unwrap();
    let mut pilot = client.connect_channel().await.unwrap();
    watcher.join(&mission.id).await.unwrap();
    wait_for_group(&state, &mission.id, 1).await;

    let mut payload = serde_json::Map::new();
    payload.insert("droneId".into(), json!(drone.id));
    payload.insert("position".into(), json!([-121.495, 38.505]));
    pilot
        .publish(PositionUpdate {
            mission_id: mission.id.clone(),
            payload,
        })
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(5), watcher.next_event())
        .await
        .expect("position within timeout")
        .unwrap();
    match event {
        Some(ServerEvent::DronePosition(update)) => {
            assert_eq!(update.mission_id, mission.id);
            assert_eq!(update.payload["droneId"], json!(drone.id));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Leaving stops delivery to this observer.
    watcher.leave(&mission.id).await.unwrap();
    wait_for_group(&state, &mission.id, 0).await;

    pilot.chat(&format!("mission status {}", mission.id)).await.unwrap();
    let reply = timeout(Duration::from_secs(5), pilot.next_event())
        .await
        .expect("chat reply within timeout")
        .unwrap();
    assert_eq!(
        reply,
        Some(ServerEvent::ChatResponse(CHAT_FAILURE_REPLY.to_string()))
    );
}

#[tokio::test]
async fn test_sdk_surfaces_api_errors() {
    let (base, _state) = spawn_server().await;
    let client = SurveyClient::new(&base);

    let drone = client
        .create_drone(&CreateDroneRequest {
            name: "Kestrel".to_string(),
            serial_number: "KS-1".to_string(),
            status: None,
            battery_level: None,
            location: None,
            specifications: None,
        })
        .await
        .unwrap();

    let mission = client.create_mission(&survey_request(&drone.id)).await.unwrap();
    let err = client
        .create_mission(&survey_request(&drone.id))
        .await
        .unwrap_err();
    let api_err = err.downcast_ref::<ApiError>().expect("api error");
    assert_eq!(api_err.status, 409);

    let aborted = client
        .control_mission(&mission.id, MissionAction::Abort)
        .await
        .unwrap();
    assert_eq!(aborted.status, MissionStatus::Aborted);
    let drone = client.get_drone(&drone.id).await.unwrap();
    assert_eq!(drone.status, DroneStatus::Available);

    let missing = client.get_report("nope").await.unwrap_err();
    assert_eq!(missing.downcast_ref::<ApiError>().unwrap().status, 404);
}
