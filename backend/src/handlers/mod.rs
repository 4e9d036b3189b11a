pub mod extension;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/players/:player_id/extensions", get(extension::player_extensions))
        .route("/api/servers/:server_id/extensions", get(extension::server_extensions))
        .route(
            "/api/servers/:server_id/extensions/players-table",
            get(extension::server_players_table),
        )
}
