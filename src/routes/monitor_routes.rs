use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::monitor_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .route("/api/monitor/stop", post(monitor_controller::post_stop_monitor))
        .route("/api/monitor/status", get(monitor_controller::get_monitor_status))
}
