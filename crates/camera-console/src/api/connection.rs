use axum::extract::State;
use axum::Json;

use crate::connection::ConnectionSnapshot;
use crate::state::AppState;

pub async fn get_connection(State(state): State<AppState>) -> Json<ConnectionSnapshot> {
    Json(state.connection_snapshot())
}
