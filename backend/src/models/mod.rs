pub mod extension;

pub use extension::{
    Descriptor, DescribedValue, ExtensionData, FormatKind, Icon, IconFamily, PluginInfo, TabData,
    TabElement, TabInfo, Table, TableRow, Value, DEFAULT_ELEMENT_ORDER, DEFAULT_TAB_PRIORITY,
    TABLE_PLAYERS_COLUMN,
};
