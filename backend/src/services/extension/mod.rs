//! Extension Data Model & Aggregation Engine
//!
//! Independently authored plugins contribute typed metrics ("extensions")
//! into a narrow relational schema; this module reconstructs the
//! strongly-typed hierarchical view (plugin → tab → metric) from flattened
//! joined rows and merges the outputs of several independent queries into
//! one consistent object graph.
//!
//! Data flows one way: rows → decode/resolve → per-query builders →
//! combine across queries → assembled [`ExtensionData`] handed to the
//! caller. Everything handed out is a fresh read-only projection; builders
//! live for one request only.

pub mod builder;
pub mod decode;
pub mod queries;
pub mod rows;


use std::collections::BTreeMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{ExtensionData, PluginInfo, TabData};
use crate::utils::{ApiError, ApiResult};

use builder::{combine, ExtensionBuilders};
use queries::AGGREGATE_KINDS;

#[derive(Clone)]
pub struct ExtensionService {
    pool: SqlitePool,
}

impl ExtensionService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All extension data for one player: per-player values and group
    /// memberships merged, one `ExtensionData` per plugin that produced
    /// anything.
    pub async fn player_extension_data(&self, player_id: Uuid) -> ApiResult<Vec<ExtensionData>> {
        let plugins = queries::all_plugins(&self.pool).await?;

        // The two queries fetch disjoint row sets; run them concurrently
        // and fold in a fixed order afterwards.
        let (values, groups) = tokio::try_join!(
            queries::player_values(&self.pool, player_id),
            queries::player_groups(&self.pool, player_id),
        )?;
        let merged = combine(values, groups);

        tracing::debug!(
            "Assembled player extension data: {} plugins with data of {} registered",
            merged.len(),
            plugins.len()
        );
        Ok(Self::assemble(plugins, merged))
    }

    /// All extension data for one server: server-level values, the four
    /// player-value aggregates and the group tables, merged in that order.
    pub async fn server_extension_data(&self, server_id: Uuid) -> ApiResult<Vec<ExtensionData>> {
        let plugins = queries::server_plugins(&self.pool, server_id).await?;

        let (values, booleans, doubles, numbers, percentages, group_tables) = tokio::try_join!(
            queries::server_values(&self.pool, server_id),
            queries::server_player_aggregates(&self.pool, server_id, AGGREGATE_KINDS[0]),
            queries::server_player_aggregates(&self.pool, server_id, AGGREGATE_KINDS[1]),
            queries::server_player_aggregates(&self.pool, server_id, AGGREGATE_KINDS[2]),
            queries::server_player_aggregates(&self.pool, server_id, AGGREGATE_KINDS[3]),
            queries::server_group_tables(&self.pool, server_id),
        )?;

        let mut merged = values;
        for partial in [booleans, doubles, numbers, percentages, group_tables] {
            merged = combine(merged, partial);
        }

        tracing::debug!(
            "Assembled server extension data: {} plugins with data of {} registered",
            merged.len(),
            plugins.len()
        );
        Ok(Self::assemble(plugins, merged))
    }

    /// Extension-table data for the `limit` most recently seen players of
    /// one server: values and group memberships per player, merged into a
    /// single flat tab per player.
    pub async fn players_table_data(
        &self,
        server_id: Uuid,
        limit: u32,
    ) -> ApiResult<BTreeMap<Uuid, TabData>> {
        let player_ids = queries::recent_player_ids(&self.pool, server_id, limit).await?;
        if player_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let (mut values, groups) = tokio::try_join!(
            queries::players_table_values(&self.pool, &player_ids),
            queries::players_table_groups(&self.pool, &player_ids),
        )?;

        // Group memberships are the secondary source: they win on a
        // descriptor-name collision, same rule as the plugin-level combine.
        for (player_id, tab) in groups {
            match values.entry(player_id) {
                std::collections::hash_map::Entry::Occupied(mut slot) => slot.get_mut().merge(tab),
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(tab);
                },
            }
        }

        values
            .into_iter()
            .map(|(player_id, tab)| {
                let player_id = Uuid::parse_str(&player_id).map_err(|e| {
                    ApiError::internal_error(format!("invalid player id '{player_id}': {e}"))
                })?;
                Ok((player_id, tab.build()))
            })
            .collect()
    }

    /// Players whose stored group for `provider_name` matches one of
    /// `groups` ("null" entries mean players without a stored group).
    pub async fn players_in_groups(
        &self,
        plugin_id: i64,
        provider_name: &str,
        groups: &[String],
    ) -> ApiResult<Vec<Uuid>> {
        queries::players_in_groups(&self.pool, plugin_id, provider_name, groups).await
    }

    /// Pairs each plugin with its partial result. Plugins that produced no
    /// data are dropped, not represented with empty graphs.
    fn assemble(plugins: Vec<PluginInfo>, mut partials: ExtensionBuilders) -> Vec<ExtensionData> {
        let mut assembled = Vec::with_capacity(partials.len());
        for plugin in plugins {
            if let Some(extension) = partials.remove(plugin.id) {
                assembled.push(extension.build(plugin));
            }
        }
        assembled
    }
}
