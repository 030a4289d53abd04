//! REST API routes.

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::api::{drones, missions, reports, request_id, ws};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    let drone_routes = Router::new()
        .route("/api/drones", get(drones::list_drones).post(drones::create_drone))
        .route("/api/drones/stats", get(drones::drone_stats))
        .route(
            "/api/drones/:id",
            get(drones::get_drone)
                .patch(drones::update_drone)
                .put(drones::update_drone)
                .delete(drones::delete_drone),
        )
        .route("/api/drones/:id/status", patch(drones::set_status))
        .route("/api/drones/:id/location", patch(drones::set_location));

    let mission_routes = Router::new()
        .route(
            "/api/missions",
            get(missions::list_missions).post(missions::create_mission),
        )
        .route("/api/missions/stats", get(missions::mission_stats))
        .route(
            "/api/missions/:id",
            get(missions::get_mission)
                .patch(missions::update_mission)
                .put(missions::update_mission)
                .delete(missions::delete_mission),
        )
        .route("/api/missions/:id/progress", patch(missions::update_progress))
        .route("/api/missions/:id/control", post(missions::control_mission));

    let report_routes = Router::new()
        .route(
            "/api/reports",
            get(reports::list_reports).post(reports::generate_report),
        )
        .route(
            "/api/reports/:id",
            get(reports::get_report).delete(reports::delete_report),
        );

    Router::new()
        .merge(drone_routes)
        .merge(mission_routes)
        .merge(report_routes)
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(|| async { "OK" }))
        .layer(middleware::from_fn(request_id::tag_request))
}
