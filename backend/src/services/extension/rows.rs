//! Row shapes shared by the query library, plus resolution of raw row
//! fields into descriptor/tab/icon metadata with the documented fallbacks.

use sqlx::FromRow;

use crate::models::{Descriptor, FormatKind, Icon, TabInfo};

/// SELECT list for provider/tab/icon metadata, shared by every query that
/// joins through `provider`. Expects aliases `pr` (provider), `pi`
/// (provider icon), `t` (tab) and `ti` (tab icon).
pub(crate) const PROVIDER_METADATA_COLUMNS: &str = "\
    pr.plugin_id AS plugin_id, \
    pr.name AS provider_name, \
    pr.label_text AS provider_text, \
    pr.description AS provider_description, \
    pr.priority AS provider_priority, \
    pr.format_kind AS format_kind, \
    pr.is_player_name AS is_player_name, \
    pi.name AS provider_icon_name, \
    pi.family AS provider_icon_family, \
    pi.color AS provider_icon_color, \
    t.name AS tab_name, \
    t.priority AS tab_priority, \
    t.element_order AS tab_element_order, \
    ti.name AS tab_icon_name, \
    ti.family AS tab_icon_family, \
    ti.color AS tab_icon_color";

/// JOIN chain matching [`PROVIDER_METADATA_COLUMNS`]. Metadata joins are all
/// LEFT JOINs: missing icons or tabs degrade to defaults, never drop rows.
pub(crate) const PROVIDER_METADATA_JOINS: &str = "\
    LEFT JOIN icon pi ON pi.id = pr.icon_id \
    LEFT JOIN tab t ON t.id = pr.tab_id \
    LEFT JOIN icon ti ON ti.id = t.icon_id";

/// Provider and tab metadata as read from one joined row.
#[derive(Debug, Clone, FromRow)]
pub struct ProviderRow {
    pub plugin_id: i64,
    pub provider_name: String,
    pub provider_text: String,
    pub provider_description: Option<String>,
    pub provider_priority: i64,
    pub format_kind: Option<String>,
    pub is_player_name: bool,
    pub provider_icon_name: Option<String>,
    pub provider_icon_family: Option<String>,
    pub provider_icon_color: Option<String>,
    pub tab_name: Option<String>,
    pub tab_priority: Option<i64>,
    pub tab_element_order: Option<String>,
    pub tab_icon_name: Option<String>,
    pub tab_icon_family: Option<String>,
    pub tab_icon_color: Option<String>,
}

impl ProviderRow {
    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: self.provider_name.clone(),
            text: self.provider_text.clone(),
            description: self.provider_description.clone(),
            icon: Icon::resolve(
                self.provider_icon_name.clone(),
                self.provider_icon_family.as_deref(),
                self.provider_icon_color.as_deref(),
            ),
            priority: self.provider_priority,
        }
    }

    pub fn format(&self) -> FormatKind {
        FormatKind::parse(self.format_kind.as_deref())
    }

    /// Tab key for accumulation; missing tab name is the default tab "".
    pub fn tab_name(&self) -> &str {
        self.tab_name.as_deref().unwrap_or("")
    }

    pub fn tab_info(&self) -> TabInfo {
        TabInfo::resolve(
            self.tab_name.clone(),
            self.tab_priority,
            self.tab_element_order.as_deref(),
            Icon::resolve(
                self.tab_icon_name.clone(),
                self.tab_icon_family.as_deref(),
                self.tab_icon_color.as_deref(),
            ),
        )
    }

    /// Color used for tables built from this provider's groups.
    pub fn table_color(&self) -> String {
        crate::models::extension::resolve_color(self.provider_icon_color.as_deref())
    }
}

/// The six optional value columns of `player_value` / `server_value`.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ValueColumns {
    pub boolean_value: Option<bool>,
    pub double_value: Option<f64>,
    pub percentage_value: Option<f64>,
    pub number_value: Option<i64>,
    pub text_value: Option<String>,
    pub rich_text_value: Option<String>,
}

/// One (scope, descriptor) value row.
#[derive(Debug, FromRow)]
pub struct ProviderValueRow {
    #[sqlx(flatten)]
    pub provider: ProviderRow,
    #[sqlx(flatten)]
    pub columns: ValueColumns,
}

/// Value row carrying the owning player, for the recent-players table.
#[derive(Debug, FromRow)]
pub struct PlayerValueRow {
    pub player_id: String,
    #[sqlx(flatten)]
    pub provider: ProviderRow,
    #[sqlx(flatten)]
    pub columns: ValueColumns,
}

/// Server-wide pre-aggregated value, one row per descriptor.
#[derive(Debug, FromRow)]
pub struct AggregateValueRow {
    #[sqlx(flatten)]
    pub provider: ProviderRow,
    pub aggregate_value: f64,
}

/// One `COUNT(1) GROUP BY group_name, provider` row.
#[derive(Debug, FromRow)]
pub struct GroupCountRow {
    #[sqlx(flatten)]
    pub provider: ProviderRow,
    pub group_name: Option<String>,
    pub group_count: i64,
}

/// One player's membership in one provider's group.
#[derive(Debug, FromRow)]
pub struct PlayerGroupRow {
    pub player_id: String,
    #[sqlx(flatten)]
    pub provider: ProviderRow,
    pub group_name: Option<String>,
}

/// Registered plugin identity row.
#[derive(Debug, FromRow)]
pub struct PluginRow {
    pub id: i64,
    pub name: String,
    pub icon_name: Option<String>,
    pub icon_family: Option<String>,
    pub icon_color: Option<String>,
}

impl PluginRow {
    pub fn into_info(self) -> crate::models::PluginInfo {
        crate::models::PluginInfo {
            id: self.id,
            name: self.name,
            icon: Icon::resolve(self.icon_name, self.icon_family.as_deref(), self.icon_color.as_deref()),
        }
    }
}
