//! The query library: parameterized read-only queries over the extension
//! schema, each wiring its rows into the request-scoped builders.
//!
//! Every query constrains `pr.hidden = 0` and its scope equality (player
//! or server UUID). Failures propagate unchanged; there is no retry here.

use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{PluginInfo, TabInfo, Value};
use crate::utils::{ApiError, ApiResult};

use super::builder::{ExtensionBuilders, TabDataBuilder, TableBuilder};
use super::decode::decode_value;
use super::rows::{
    AggregateValueRow, GroupCountRow, PlayerGroupRow, PlayerValueRow, PluginRow, ProviderValueRow,
    PROVIDER_METADATA_COLUMNS, PROVIDER_METADATA_JOINS,
};

const VALUE_COLUMNS: &str = "\
    v.boolean_value AS boolean_value, \
    v.double_value AS double_value, \
    v.percentage_value AS percentage_value, \
    v.number_value AS number_value, \
    v.text_value AS text_value, \
    v.rich_text_value AS rich_text_value";

/// All registered plugins, ordered by name.
pub async fn all_plugins(pool: &SqlitePool) -> ApiResult<Vec<PluginInfo>> {
    let rows: Vec<PluginRow> = sqlx::query_as(
        r#"
        SELECT pl.id AS id, pl.name AS name,
               ic.name AS icon_name, ic.family AS icon_family, ic.color AS icon_color
        FROM plugin pl
        LEFT JOIN icon ic ON ic.id = pl.icon_id
        ORDER BY pl.name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(PluginRow::into_info).collect())
}

/// Plugins registered for one server, ordered by name.
pub async fn server_plugins(pool: &SqlitePool, server_id: Uuid) -> ApiResult<Vec<PluginInfo>> {
    let rows: Vec<PluginRow> = sqlx::query_as(
        r#"
        SELECT pl.id AS id, pl.name AS name,
               ic.name AS icon_name, ic.family AS icon_family, ic.color AS icon_color
        FROM plugin pl
        LEFT JOIN icon ic ON ic.id = pl.icon_id
        WHERE pl.server_scope = ?
        ORDER BY pl.name ASC
        "#,
    )
    .bind(server_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(PluginRow::into_info).collect())
}

/// Per-player values: one row per (player, descriptor).
pub async fn player_values(pool: &SqlitePool, player_id: Uuid) -> ApiResult<ExtensionBuilders> {
    let sql = format!(
        "SELECT {PROVIDER_METADATA_COLUMNS}, {VALUE_COLUMNS} \
         FROM player_value v \
         JOIN provider pr ON pr.id = v.provider_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE v.player_id = ? AND pr.hidden = 0"
    );
    let rows: Vec<ProviderValueRow> = sqlx::query_as(&sql)
        .bind(player_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut builders = ExtensionBuilders::new();
    for row in rows {
        let Some(value) = decode_value(&row.columns, row.provider.format(), row.provider.is_player_name)
        else {
            continue;
        };
        let descriptor = row.provider.descriptor();
        builders
            .tab(row.provider.plugin_id, row.provider.tab_name(), || Ok(row.provider.tab_info()))?
            .put_value(descriptor, value);
    }
    Ok(builders)
}

/// Server-level values: one row per (server, descriptor).
pub async fn server_values(pool: &SqlitePool, server_id: Uuid) -> ApiResult<ExtensionBuilders> {
    let sql = format!(
        "SELECT {PROVIDER_METADATA_COLUMNS}, {VALUE_COLUMNS} \
         FROM server_value v \
         JOIN provider pr ON pr.id = v.provider_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE v.server_id = ? AND pr.hidden = 0"
    );
    let rows: Vec<ProviderValueRow> = sqlx::query_as(&sql)
        .bind(server_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut builders = ExtensionBuilders::new();
    for row in rows {
        let Some(value) = decode_value(&row.columns, row.provider.format(), row.provider.is_player_name)
        else {
            continue;
        };
        let descriptor = row.provider.descriptor();
        builders
            .tab(row.provider.plugin_id, row.provider.tab_name(), || Ok(row.provider.tab_info()))?
            .put_value(descriptor, value);
    }
    Ok(builders)
}

/// Which per-player value kind a server-wide aggregate runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Booleans,
    Doubles,
    Numbers,
    Percentages,
}

/// Fixed fold order for the server-scope aggregates.
pub const AGGREGATE_KINDS: [AggregateKind; 4] = [
    AggregateKind::Booleans,
    AggregateKind::Doubles,
    AggregateKind::Numbers,
    AggregateKind::Percentages,
];

impl AggregateKind {
    fn select_expr(self) -> &'static str {
        match self {
            // Booleans aggregate to the share of players where the value
            // holds, expressed as a percentage.
            Self::Booleans => "AVG(v.boolean_value) * 100.0",
            Self::Doubles => "AVG(v.double_value)",
            Self::Numbers => "AVG(v.number_value)",
            Self::Percentages => "AVG(v.percentage_value)",
        }
    }

    fn value_column(self) -> &'static str {
        match self {
            Self::Booleans => "v.boolean_value",
            Self::Doubles => "v.double_value",
            Self::Numbers => "v.number_value",
            Self::Percentages => "v.percentage_value",
        }
    }
}

/// Server-wide aggregate over per-player values: one pre-aggregated row per
/// descriptor, no per-player fan-out reaches the builders.
pub async fn server_player_aggregates(
    pool: &SqlitePool,
    server_id: Uuid,
    kind: AggregateKind,
) -> ApiResult<ExtensionBuilders> {
    let sql = format!(
        "SELECT {PROVIDER_METADATA_COLUMNS}, {expr} AS aggregate_value \
         FROM player_value v \
         JOIN provider pr ON pr.id = v.provider_id \
         JOIN plugin pl ON pl.id = pr.plugin_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE pl.server_scope = ? AND pr.hidden = 0 AND {column} IS NOT NULL \
         GROUP BY pr.id",
        expr = kind.select_expr(),
        column = kind.value_column(),
    );
    let rows: Vec<AggregateValueRow> = sqlx::query_as(&sql)
        .bind(server_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut builders = ExtensionBuilders::new();
    for row in rows {
        let value = match kind {
            AggregateKind::Booleans | AggregateKind::Percentages => {
                Value::Percentage { value: row.aggregate_value }
            },
            AggregateKind::Doubles => Value::Double { value: row.aggregate_value },
            AggregateKind::Numbers => Value::Number {
                value: row.aggregate_value.round() as i64,
                format: row.provider.format(),
            },
        };
        let descriptor = row.provider.descriptor();
        builders
            .tab(row.provider.plugin_id, row.provider.tab_name(), || Ok(row.provider.tab_info()))?
            .put_value(descriptor, value);
    }
    Ok(builders)
}

/// Group-count aggregate: one table per provider, one row per group name,
/// ordered by (provider, group name ascending). Memberships without a
/// group name do not produce table rows.
pub async fn server_group_tables(pool: &SqlitePool, server_id: Uuid) -> ApiResult<ExtensionBuilders> {
    let sql = format!(
        "SELECT {PROVIDER_METADATA_COLUMNS}, g.group_name AS group_name, COUNT(1) AS group_count \
         FROM group_membership g \
         JOIN provider pr ON pr.id = g.provider_id \
         JOIN plugin pl ON pl.id = pr.plugin_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE pl.server_scope = ? AND pr.hidden = 0 AND g.group_name IS NOT NULL \
         GROUP BY pr.id, g.group_name \
         ORDER BY pr.id ASC, g.group_name ASC"
    );
    let rows: Vec<GroupCountRow> = sqlx::query_as(&sql)
        .bind(server_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut builders = ExtensionBuilders::new();
    for row in rows {
        let Some(group) = row.group_name else { continue };
        let descriptor = row.provider.descriptor();
        let color = row.provider.table_color();
        let tab = builders.tab(row.provider.plugin_id, row.provider.tab_name(), || {
            Ok(row.provider.tab_info())
        })?;
        tab.table(&descriptor.name, || {
            TableBuilder::new(
                descriptor.name.clone(),
                color,
                descriptor.text.clone(),
                descriptor.icon.clone(),
            )
        })
        .set_row(group, row.group_count);
    }
    Ok(builders)
}

/// One player's group memberships as `GroupMembership` values.
pub async fn player_groups(pool: &SqlitePool, player_id: Uuid) -> ApiResult<ExtensionBuilders> {
    let sql = format!(
        "SELECT g.player_id AS player_id, {PROVIDER_METADATA_COLUMNS}, g.group_name AS group_name \
         FROM group_membership g \
         JOIN provider pr ON pr.id = g.provider_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE g.player_id = ? AND pr.hidden = 0"
    );
    let rows: Vec<PlayerGroupRow> = sqlx::query_as(&sql)
        .bind(player_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut builders = ExtensionBuilders::new();
    for row in rows {
        let Some(group) = row.group_name else { continue };
        let descriptor = row.provider.descriptor();
        builders
            .tab(row.provider.plugin_id, row.provider.tab_name(), || Ok(row.provider.tab_info()))?
            .put_value(descriptor, Value::GroupMembership { group });
    }
    Ok(builders)
}

/// Players whose stored group value for one provider is in `groups`. The
/// literal string "null" (any case) in the input means "no group stored",
/// not the string itself, and is normalized to an IS NULL arm here.
pub async fn players_in_groups(
    pool: &SqlitePool,
    plugin_id: i64,
    provider_name: &str,
    groups: &[String],
) -> ApiResult<Vec<Uuid>> {
    let mut include_null = false;
    let named: Vec<&str> = groups
        .iter()
        .filter_map(|group| {
            if group.eq_ignore_ascii_case("null") {
                include_null = true;
                None
            } else {
                Some(group.as_str())
            }
        })
        .collect();

    let mut clauses = Vec::new();
    if !named.is_empty() {
        let placeholders = vec!["?"; named.len()].join(", ");
        clauses.push(format!("g.group_name IN ({placeholders})"));
    }
    if include_null {
        clauses.push("g.group_name IS NULL".to_string());
    }
    if clauses.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT DISTINCT g.player_id \
         FROM group_membership g \
         JOIN provider pr ON pr.id = g.provider_id \
         WHERE pr.plugin_id = ? AND pr.name = ? AND pr.hidden = 0 AND ({})",
        clauses.join(" OR ")
    );

    let mut query = sqlx::query_scalar::<_, String>(&sql)
        .bind(plugin_id)
        .bind(provider_name);
    for group in &named {
        query = query.bind(*group);
    }
    let ids = query.fetch_all(pool).await?;

    ids.iter()
        .map(|id| {
            Uuid::parse_str(id).map_err(|e| {
                ApiError::internal_error(format!("invalid player id '{id}' in group_membership: {e}"))
            })
        })
        .collect()
}

/// The `limit` most recently seen players of one server, most recent first.
pub async fn recent_player_ids(
    pool: &SqlitePool,
    server_id: Uuid,
    limit: u32,
) -> ApiResult<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT s.player_id
        FROM session s
        WHERE s.server_id = ?
        GROUP BY s.player_id
        ORDER BY MAX(s.session_end) DESC
        LIMIT ?
        "#,
    )
    .bind(server_id.to_string())
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;
    tracing::debug!("Recent-players scope resolved to {} players", ids.len());
    Ok(ids)
}

/// Values for the recent-players table, restricted to the given players
/// and to providers flagged for it. One flat tab builder per player.
pub async fn players_table_values(
    pool: &SqlitePool,
    player_ids: &[String],
) -> ApiResult<HashMap<String, TabDataBuilder>> {
    if player_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders = vec!["?"; player_ids.len()].join(", ");
    let sql = format!(
        "SELECT v.player_id AS player_id, {PROVIDER_METADATA_COLUMNS}, {VALUE_COLUMNS} \
         FROM player_value v \
         JOIN provider pr ON pr.id = v.provider_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE pr.hidden = 0 AND pr.show_in_players_table = 1 \
           AND v.player_id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, PlayerValueRow>(&sql);
    for id in player_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut players: HashMap<String, TabDataBuilder> = HashMap::new();
    for row in rows {
        let Some(value) = decode_value(&row.columns, row.provider.format(), row.provider.is_player_name)
        else {
            continue;
        };
        players
            .entry(row.player_id)
            .or_insert_with(|| TabDataBuilder::new(TabInfo::default()))
            .put_value(row.provider.descriptor(), value);
    }
    Ok(players)
}

/// Group memberships for the recent-players table, same shape as
/// [`players_table_values`].
pub async fn players_table_groups(
    pool: &SqlitePool,
    player_ids: &[String],
) -> ApiResult<HashMap<String, TabDataBuilder>> {
    if player_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders = vec!["?"; player_ids.len()].join(", ");
    let sql = format!(
        "SELECT g.player_id AS player_id, {PROVIDER_METADATA_COLUMNS}, g.group_name AS group_name \
         FROM group_membership g \
         JOIN provider pr ON pr.id = g.provider_id \
         {PROVIDER_METADATA_JOINS} \
         WHERE pr.hidden = 0 AND pr.show_in_players_table = 1 \
           AND g.player_id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, PlayerGroupRow>(&sql);
    for id in player_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut players: HashMap<String, TabDataBuilder> = HashMap::new();
    for row in rows {
        let Some(group) = row.group_name else { continue };
        players
            .entry(row.player_id)
            .or_insert_with(|| TabDataBuilder::new(TabInfo::default()))
            .put_value(row.provider.descriptor(), Value::GroupMembership { group });
    }
    Ok(players)
}
