pub mod actions;
pub mod cameras;
pub mod connection;
pub mod csv;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use crate::websocket;

/// Console API and websocket routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/api/console/cameras", get(cameras::list_page).post(cameras::add_camera))
        .route("/api/console/cameras/:id/vlc", post(cameras::launch_vlc))
        .route("/api/console/refresh", post(cameras::refresh))
        .route("/api/console/page", post(cameras::change_page))
        .route(
            "/api/console/selection",
            get(cameras::get_selection)
                .put(cameras::set_selection)
                .delete(cameras::clear_selection),
        )
        .route("/api/console/check", post(actions::check))
        .route("/api/console/validate", post(actions::validate))
        .route("/api/console/apply-config", post(actions::apply_config))
        .route("/api/console/delete", post(actions::delete_selected))
        .route("/api/console/import-csv", post(csv::import_csv))
        .route("/api/console/choose-from-csv", post(csv::choose_from_csv))
        .route("/api/console/export-validation", post(csv::export_validation))
        .route("/api/console/connection", get(connection::get_connection))
        .route("/ws", get(websocket::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API routes with the frontend bundle served for everything else.
pub fn app(state: AppState, frontend_dir: &Path) -> Router {
    let frontend_service = ServeDir::new(frontend_dir).append_index_html_on_directories(true);
    router(state).fallback_service(frontend_service)
}
