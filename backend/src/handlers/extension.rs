use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::AppState;
use crate::models::{ExtensionData, TabData};
use crate::utils::ApiResult;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PlayersTableParams {
    /// Number of most-recently-seen players to include (default from config)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayersTableResponse {
    pub players: BTreeMap<Uuid, TabData>,
}

// All extension data for one player
#[utoipa::path(
    get,
    path = "/api/players/{player_id}/extensions",
    params(
        ("player_id" = Uuid, Path, description = "Player UUID")
    ),
    responses(
        (status = 200, description = "Extension data per plugin", body = Vec<ExtensionData>)
    ),
    tag = "Extensions"
)]
pub async fn player_extensions(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ExtensionData>>> {
    tracing::debug!("Fetching extension data for player {}", player_id);

    let data = state.extension_service.player_extension_data(player_id).await?;

    tracing::debug!("Retrieved extension data for {} plugins", data.len());
    Ok(Json(data))
}

// All extension data for one server
#[utoipa::path(
    get,
    path = "/api/servers/{server_id}/extensions",
    params(
        ("server_id" = Uuid, Path, description = "Server UUID")
    ),
    responses(
        (status = 200, description = "Extension data per plugin", body = Vec<ExtensionData>)
    ),
    tag = "Extensions"
)]
pub async fn server_extensions(
    State(state): State<Arc<AppState>>,
    Path(server_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ExtensionData>>> {
    tracing::debug!("Fetching extension data for server {}", server_id);

    let data = state.extension_service.server_extension_data(server_id).await?;

    tracing::debug!("Retrieved extension data for {} plugins", data.len());
    Ok(Json(data))
}

// Extension-table data for the most recent players of one server
#[utoipa::path(
    get,
    path = "/api/servers/{server_id}/extensions/players-table",
    params(
        ("server_id" = Uuid, Path, description = "Server UUID"),
        PlayersTableParams
    ),
    responses(
        (status = 200, description = "Per-player extension values", body = PlayersTableResponse)
    ),
    tag = "Extensions"
)]
pub async fn server_players_table(
    State(state): State<Arc<AppState>>,
    Path(server_id): Path<Uuid>,
    Query(params): Query<PlayersTableParams>,
) -> ApiResult<Json<PlayersTableResponse>> {
    let limit = params
        .limit
        .unwrap_or(state.config.analytics.players_table_limit);
    tracing::debug!("Fetching players-table data for server {} (limit {})", server_id, limit);

    let players = state.extension_service.players_table_data(server_id, limit).await?;

    tracing::debug!("Retrieved players-table data for {} players", players.len());
    Ok(Json(PlayersTableResponse { players }))
}
