//! Request-scoped accumulation state for one query's row loop, and the
//! pure combiner that folds independent query results together.
//!
//! Builders are created per query execution and discarded after the
//! assembled graph is handed off; nothing here is shared across requests.

use std::collections::{BTreeMap, HashMap, btree_map, hash_map};

use crate::models::{
    Descriptor, DescribedValue, ExtensionData, Icon, PluginInfo, TabData, TabInfo, Table,
    TableRow, Value, TABLE_PLAYERS_COLUMN,
};
use crate::utils::ApiResult;

/// Partial results of one query: plugin id mapped to its in-progress data.
#[derive(Debug, Default)]
pub struct ExtensionBuilders {
    extensions: HashMap<i64, ExtensionBuilder>,
}

impl ExtensionBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(&mut self, plugin_id: i64) -> &mut ExtensionBuilder {
        self.extensions
            .entry(plugin_id)
            .or_insert_with(|| ExtensionBuilder::new(plugin_id))
    }

    /// Shorthand for the common wiring: look up the tab builder for a
    /// (plugin, tab) pair, constructing tab metadata only on first sight.
    pub fn tab(
        &mut self,
        plugin_id: i64,
        tab_name: &str,
        make_info: impl FnOnce() -> ApiResult<TabInfo>,
    ) -> ApiResult<&mut TabDataBuilder> {
        self.extension(plugin_id).tab(tab_name, make_info)
    }

    pub fn get(&self, plugin_id: i64) -> Option<&ExtensionBuilder> {
        self.extensions.get(&plugin_id)
    }

    pub fn remove(&mut self, plugin_id: i64) -> Option<ExtensionBuilder> {
        self.extensions.remove(&plugin_id)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Merges two partial result mappings into one. Plugins only in
/// `secondary` are inserted as-is; plugins in both are merged tab-wise,
/// with value lists unioned by descriptor name and `secondary` winning on
/// a collision. Fold query results through this left-to-right in a fixed
/// order: the output depends on order only when descriptors collide.
pub fn combine(mut primary: ExtensionBuilders, secondary: ExtensionBuilders) -> ExtensionBuilders {
    for (plugin_id, extension) in secondary.extensions {
        match primary.extensions.entry(plugin_id) {
            hash_map::Entry::Vacant(slot) => {
                slot.insert(extension);
            },
            hash_map::Entry::Occupied(mut slot) => slot.get_mut().merge(extension),
        }
    }
    primary
}

/// In-progress data of one plugin: tab name mapped to its builder.
#[derive(Debug)]
pub struct ExtensionBuilder {
    plugin_id: i64,
    tabs: BTreeMap<String, TabDataBuilder>,
}

impl ExtensionBuilder {
    fn new(plugin_id: i64) -> Self {
        Self { plugin_id, tabs: BTreeMap::new() }
    }

    pub fn plugin_id(&self) -> i64 {
        self.plugin_id
    }

    /// Returns the tab builder for `tab_name`, invoking `make_info` only
    /// the first time the name is seen within this builder. Repeated rows
    /// neither rebuild the metadata nor resurface a factory failure.
    pub fn tab(
        &mut self,
        tab_name: &str,
        make_info: impl FnOnce() -> ApiResult<TabInfo>,
    ) -> ApiResult<&mut TabDataBuilder> {
        match self.tabs.entry(tab_name.to_string()) {
            btree_map::Entry::Occupied(slot) => Ok(slot.into_mut()),
            btree_map::Entry::Vacant(slot) => Ok(slot.insert(TabDataBuilder::new(make_info()?))),
        }
    }

    fn merge(&mut self, other: ExtensionBuilder) {
        for (tab_name, tab) in other.tabs {
            match self.tabs.entry(tab_name) {
                btree_map::Entry::Occupied(mut slot) => slot.get_mut().merge(tab),
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(tab);
                },
            }
        }
    }

    /// Finalizes the plugin's data: tabs ordered by priority ascending,
    /// ties broken by tab name ascending.
    pub fn build(self, plugin: PluginInfo) -> ExtensionData {
        let mut tabs: Vec<TabData> = self.tabs.into_values().map(TabDataBuilder::build).collect();
        tabs.sort_by(|a, b| {
            a.tab
                .priority
                .cmp(&b.tab.priority)
                .then_with(|| a.tab.name.cmp(&b.tab.name))
        });
        ExtensionData { plugin, tabs }
    }
}

/// Accumulates the values and tables of one (plugin, tab) pair. Values are
/// keyed by descriptor name, so no two values in a tab ever share one.
#[derive(Debug)]
pub struct TabDataBuilder {
    info: TabInfo,
    values: BTreeMap<String, DescribedValue>,
    tables: BTreeMap<String, TableBuilder>,
}

impl TabDataBuilder {
    pub fn new(info: TabInfo) -> Self {
        Self { info, values: BTreeMap::new(), tables: BTreeMap::new() }
    }

    pub fn put_value(&mut self, descriptor: Descriptor, value: Value) {
        self.values
            .insert(descriptor.name.clone(), DescribedValue { descriptor, value });
    }

    /// Returns the table builder named `table_name`, creating it via
    /// `make_table` on first use.
    pub fn table(
        &mut self,
        table_name: &str,
        make_table: impl FnOnce() -> TableBuilder,
    ) -> &mut TableBuilder {
        self.tables
            .entry(table_name.to_string())
            .or_insert_with(make_table)
    }

    pub(crate) fn merge(&mut self, other: TabDataBuilder) {
        // extend overwrites existing keys: the merged-in side wins.
        self.values.extend(other.values);
        for (name, table) in other.tables {
            match self.tables.entry(name) {
                btree_map::Entry::Occupied(mut slot) => slot.get_mut().merge(table),
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(table);
                },
            }
        }
    }

    /// Finalizes the tab: booleans split from the other value kinds (tabs
    /// order them as a separate element), each list ordered by descriptor
    /// priority descending with ties by name ascending.
    pub fn build(self) -> TabData {
        let mut values = Vec::new();
        let mut booleans = Vec::new();
        for described in self.values.into_values() {
            if described.value.is_boolean() {
                booleans.push(described);
            } else {
                values.push(described);
            }
        }
        let by_priority = |a: &DescribedValue, b: &DescribedValue| {
            b.descriptor
                .priority
                .cmp(&a.descriptor.priority)
                .then_with(|| a.descriptor.name.cmp(&b.descriptor.name))
        };
        values.sort_by(by_priority);
        booleans.sort_by(by_priority);

        let tables = self.tables.into_values().map(TableBuilder::build).collect();

        TabData { tab: self.info, values, booleans, tables }
    }
}

/// Accumulates one table's per-group member counts.
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    color: String,
    group_column: String,
    group_icon: Option<Icon>,
    rows: BTreeMap<String, i64>,
}

impl TableBuilder {
    pub fn new(name: String, color: String, group_column: String, group_icon: Option<Icon>) -> Self {
        Self { name, color, group_column, group_icon, rows: BTreeMap::new() }
    }

    /// Upserts the count for `group`; later calls overwrite, matching the
    /// one-row-per-group source shape.
    pub fn set_row(&mut self, group: String, players: i64) {
        self.rows.insert(group, players.max(0));
    }

    fn merge(&mut self, other: TableBuilder) {
        self.rows.extend(other.rows);
    }

    /// Finalizes the table; rows come out ordered by group name ascending.
    pub fn build(self) -> Table {
        Table {
            name: self.name,
            color: self.color,
            group_column: self.group_column,
            group_icon: self.group_icon,
            players_column: TABLE_PLAYERS_COLUMN.to_string(),
            rows: self
                .rows
                .into_iter()
                .map(|(group, players)| TableRow { group, players })
                .collect(),
        }
    }
}
