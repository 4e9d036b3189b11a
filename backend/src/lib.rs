pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::services::ExtensionService;

pub struct AppState {
    pub config: Config,
    pub extension_service: ExtensionService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::extension::player_extensions,
        handlers::extension::server_extensions,
        handlers::extension::server_players_table,
    ),
    components(schemas(
        models::ExtensionData,
        models::PluginInfo,
        models::TabData,
        models::TabInfo,
        models::TabElement,
        models::Table,
        models::TableRow,
        models::DescribedValue,
        models::Descriptor,
        models::Value,
        models::FormatKind,
        models::Icon,
        models::IconFamily,
        handlers::extension::PlayersTableResponse,
    )),
    tags(
        (name = "Extensions", description = "Extension data assembled per plugin, tab and metric")
    )
)]
pub struct ApiDoc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::api_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
