use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Font icon family. Unrecognized families fall back to Solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IconFamily {
    Solid,
    Regular,
    Brands,
}

impl IconFamily {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("regular") => Self::Regular,
            Some("brands") | Some("brand") => Self::Brands,
            _ => Self::Solid,
        }
    }
}

/// Color names accepted for icons and tables. Anything else resolves to NONE.
const KNOWN_COLORS: &[&str] = &[
    "NONE", "RED", "PINK", "PURPLE", "DEEP_PURPLE", "INDIGO", "BLUE", "LIGHT_BLUE", "CYAN", "TEAL",
    "GREEN", "LIGHT_GREEN", "LIME", "YELLOW", "AMBER", "ORANGE", "DEEP_ORANGE", "BROWN", "GREY",
    "BLUE_GREY", "BLACK",
];

pub fn resolve_color(raw: Option<&str>) -> String {
    match raw.map(|s| s.trim().to_ascii_uppercase()) {
        Some(color) if KNOWN_COLORS.contains(&color.as_str()) => color,
        _ => "NONE".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Icon {
    pub name: String,
    pub family: IconFamily,
    pub color: String,
}

impl Icon {
    /// Builds an icon from raw row fields. A missing name means no icon at
    /// all (the renderer supplies a placeholder); unrecognized family or
    /// color strings degrade to the documented defaults.
    pub fn resolve(name: Option<String>, family: Option<&str>, color: Option<&str>) -> Option<Self> {
        let name = name.filter(|n| !n.trim().is_empty())?;
        Some(Self { name, family: IconFamily::parse(family), color: resolve_color(color) })
    }
}

/// Display-formatting hint for numeric values. Orthogonal to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatKind {
    None,
    DateSecond,
    DateYear,
    TimeMilliseconds,
}

impl FormatKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("DATE_SECOND") => Self::DateSecond,
            Some("DATE_YEAR") => Self::DateYear,
            Some("TIME_MILLISECONDS") => Self::TimeMilliseconds,
            _ => Self::None,
        }
    }
}

/// One typed datum attached to a descriptor. The storage schema spreads
/// these over six optional columns; this is the decoded sum type.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Value {
    Boolean { value: bool },
    Double { value: f64 },
    Percentage { value: f64 },
    Number { value: i64, format: FormatKind },
    Text { value: String, is_player_name: bool },
    RichText { value: String },
    GroupMembership { group: String },
}

impl Value {
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean { .. })
    }
}

/// Identity and display metadata of one metric contributed by an extension.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Descriptor {
    pub name: String,
    pub text: String,
    pub description: Option<String>,
    pub icon: Option<Icon>,
    pub priority: i64,
}

/// The renderable element kinds a tab can order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabElement {
    Values,
    Booleans,
    Table,
}

pub const DEFAULT_ELEMENT_ORDER: [TabElement; 3] =
    [TabElement::Values, TabElement::Booleans, TabElement::Table];

impl TabElement {
    fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "VALUES" => Some(Self::Values),
            "BOOLEANS" => Some(Self::Booleans),
            "TABLE" => Some(Self::Table),
            _ => None,
        }
    }

    /// Parses a comma-separated element order. Unrecognized tokens are
    /// dropped and missing kinds appended in default order; if nothing is
    /// recognized the full default permutation applies.
    pub fn parse_order(raw: Option<&str>) -> Vec<Self> {
        let mut order: Vec<Self> = Vec::with_capacity(3);
        if let Some(raw) = raw {
            for token in raw.split(',') {
                if let Some(element) = Self::parse(token) {
                    if !order.contains(&element) {
                        order.push(element);
                    }
                }
            }
        }
        for element in DEFAULT_ELEMENT_ORDER {
            if !order.contains(&element) {
                order.push(element);
            }
        }
        order
    }
}

pub const DEFAULT_TAB_PRIORITY: i64 = 100;

/// A named grouping of metrics. Name "" is the valid default/unnamed tab.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TabInfo {
    pub name: String,
    pub icon: Option<Icon>,
    pub element_order: Vec<TabElement>,
    pub priority: i64,
}

impl TabInfo {
    pub fn resolve(
        name: Option<String>,
        priority: Option<i64>,
        element_order: Option<&str>,
        icon: Option<Icon>,
    ) -> Self {
        Self {
            name: name.unwrap_or_default(),
            icon,
            element_order: TabElement::parse_order(element_order),
            priority: priority.unwrap_or(DEFAULT_TAB_PRIORITY),
        }
    }
}

impl Default for TabInfo {
    fn default() -> Self {
        Self::resolve(None, None, None, None)
    }
}

/// Column-2 label of every extension table.
pub const TABLE_PLAYERS_COLUMN: &str = "Players";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TableRow {
    pub group: String,
    pub players: i64,
}

/// A two-column tabular widget: group name against member count.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Table {
    pub name: String,
    pub color: String,
    pub group_column: String,
    pub group_icon: Option<Icon>,
    pub players_column: String,
    pub rows: Vec<TableRow>,
}

/// One decoded value together with the descriptor it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DescribedValue {
    pub descriptor: Descriptor,
    pub value: Value,
}

/// All values and tables belonging to one (plugin, tab) pair. Booleans are
/// split out because tabs order them as their own element kind.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TabData {
    pub tab: TabInfo,
    pub values: Vec<DescribedValue>,
    pub booleans: Vec<DescribedValue>,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PluginInfo {
    pub id: i64,
    pub name: String,
    pub icon: Option<Icon>,
}

/// Full per-plugin result: tabs ordered by (priority, name).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExtensionData {
    pub plugin: PluginInfo,
    pub tabs: Vec<TabData>,
}
