use std::collections::BTreeSet;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::models::{DescribedValue, ExtensionData, FormatKind, TabData, Value};
use crate::services::ExtensionService;
use crate::tests::common::*;

fn find_plugin<'a>(data: &'a [ExtensionData], name: &str) -> &'a ExtensionData {
    data.iter()
        .find(|e| e.plugin.name == name)
        .unwrap_or_else(|| panic!("plugin '{name}' missing from assembled data"))
}

fn find_value<'a>(tab: &'a TabData, name: &str) -> &'a DescribedValue {
    tab.values
        .iter()
        .chain(tab.booleans.iter())
        .find(|v| v.descriptor.name == name)
        .unwrap_or_else(|| panic!("descriptor '{name}' missing from tab '{}'", tab.tab.name))
}

#[tokio::test]
async fn player_data_uses_default_tab() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Essentials", &server, None).await;
    let provider = insert_provider(&pool, plugin, "homes", "Homes set", None, None).await;
    insert_player_row(&pool, provider, &player, None, None, None, Some(7), None, None).await;

    let data = service.player_extension_data(player).await.unwrap();
    assert_eq!(data.len(), 1);
    let tabs = &find_plugin(&data, "Essentials").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].tab.name, "");
    assert_eq!(tabs[0].tab.priority, 100);
    assert_eq!(
        find_value(&tabs[0], "homes").value,
        Value::Number { value: 7, format: FormatKind::None }
    );
}

#[tokio::test]
async fn player_data_merges_values_and_groups() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Perms", &server, None).await;
    let balance = insert_provider(&pool, plugin, "balance", "Balance", None, None).await;
    let rank = insert_provider(&pool, plugin, "rank", "Rank", None, None).await;
    insert_player_row(&pool, balance, &player, None, Some(12.5), None, None, None, None).await;
    insert_group(&pool, rank, &player, Some("VIP")).await;

    let data = service.player_extension_data(player).await.unwrap();
    let tabs = &find_plugin(&data, "Perms").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(find_value(&tabs[0], "balance").value, Value::Double { value: 12.5 });
    assert_eq!(
        find_value(&tabs[0], "rank").value,
        Value::GroupMembership { group: "VIP".to_string() }
    );
}

#[tokio::test]
async fn plugins_without_data_are_dropped() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let active = insert_plugin(&pool, "Active", &server, None).await;
    insert_plugin(&pool, "Silent", &server, None).await;
    let provider = insert_provider(&pool, active, "tps", "TPS", None, None).await;
    insert_server_row(&pool, provider, &server, None, Some(19.8), None, None, None, None).await;

    let data = service.server_extension_data(server).await.unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].plugin.name, "Active");
}

#[tokio::test]
async fn hidden_providers_never_surface() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Secrets", &server, None).await;
    let visible = insert_provider(&pool, plugin, "visible", "Visible", None, None).await;
    let hidden = insert_provider(&pool, plugin, "internal", "Internal", None, None).await;
    set_provider_flags(&pool, hidden, true, true).await;

    insert_player_row(&pool, visible, &player, None, Some(1.0), None, None, None, None).await;
    insert_player_row(&pool, hidden, &player, None, Some(9.0), None, None, None, None).await;
    insert_server_row(&pool, visible, &server, None, None, None, Some(5), None, None).await;
    insert_server_row(&pool, hidden, &server, None, None, None, Some(9), None, None).await;
    insert_group(&pool, hidden, &player, Some("Staff")).await;
    insert_session(&pool, &player, &server, Utc::now()).await;

    let player_data = service.player_extension_data(player).await.unwrap();
    for tab in &find_plugin(&player_data, "Secrets").tabs {
        assert!(tab.values.iter().all(|v| v.descriptor.name != "internal"));
    }

    let server_data = service.server_extension_data(server).await.unwrap();
    for tab in &find_plugin(&server_data, "Secrets").tabs {
        assert!(tab.values.iter().all(|v| v.descriptor.name != "internal"));
        assert!(tab.tables.is_empty());
    }

    let table = service.players_table_data(server, 10).await.unwrap();
    let tab = table.get(&player).expect("recent player present");
    assert!(find_value(tab, "visible").value == Value::Double { value: 1.0 });
    assert!(tab.values.iter().all(|v| v.descriptor.name != "internal"));
}

#[tokio::test]
async fn server_tabs_ordered_by_priority_then_name() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Stats", &server, None).await;
    for (tab_name, priority, provider_name) in
        [("Zeta", 300, "z"), ("Alpha", 100, "a"), ("Beta", 100, "b")]
    {
        let tab = insert_tab(&pool, Some(tab_name), Some(priority), None).await;
        let provider =
            insert_provider(&pool, plugin, provider_name, provider_name, Some(tab), None).await;
        insert_server_row(&pool, provider, &server, None, Some(1.0), None, None, None, None).await;
    }

    let data = service.server_extension_data(server).await.unwrap();
    let tab_names: Vec<&str> =
        find_plugin(&data, "Stats").tabs.iter().map(|t| t.tab.name.as_str()).collect();
    assert_eq!(tab_names, vec!["Alpha", "Beta", "Zeta"]);
}

#[tokio::test]
async fn boolean_aggregate_reported_as_percentage() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Votes", &server, None).await;
    let provider = insert_provider(&pool, plugin, "voted", "Has voted", None, None).await;
    insert_player_row(&pool, provider, &Uuid::new_v4(), Some(true), None, None, None, None, None)
        .await;
    insert_player_row(&pool, provider, &Uuid::new_v4(), Some(false), None, None, None, None, None)
        .await;

    let data = service.server_extension_data(server).await.unwrap();
    let tabs = &find_plugin(&data, "Votes").tabs;
    assert_eq!(find_value(&tabs[0], "voted").value, Value::Percentage { value: 50.0 });
}

#[tokio::test]
async fn double_aggregate_averages_one_row_per_descriptor() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Economy", &server, None).await;
    let provider = insert_provider(&pool, plugin, "balance", "Balance", None, None).await;
    insert_player_row(&pool, provider, &Uuid::new_v4(), None, Some(1.0), None, None, None, None)
        .await;
    insert_player_row(&pool, provider, &Uuid::new_v4(), None, Some(3.0), None, None, None, None)
        .await;

    let data = service.server_extension_data(server).await.unwrap();
    let tabs = &find_plugin(&data, "Economy").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].values.len(), 1);
    assert_eq!(tabs[0].values[0].value, Value::Double { value: 2.0 });
}

#[tokio::test]
async fn number_aggregate_rounds_and_keeps_format() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Playtime", &server, None).await;
    let provider = insert_provider(&pool, plugin, "playtime", "Playtime", None, None).await;
    set_provider_format(&pool, provider, "TIME_MILLISECONDS").await;
    insert_player_row(&pool, provider, &Uuid::new_v4(), None, None, None, Some(1), None, None)
        .await;
    insert_player_row(&pool, provider, &Uuid::new_v4(), None, None, None, Some(2), None, None)
        .await;

    let data = service.server_extension_data(server).await.unwrap();
    let tabs = &find_plugin(&data, "Playtime").tabs;
    assert_eq!(
        find_value(&tabs[0], "playtime").value,
        Value::Number { value: 2, format: FormatKind::TimeMilliseconds }
    );
}

#[tokio::test]
async fn group_aggregate_builds_ordered_table() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Perms", &server, None).await;
    let provider = insert_provider(&pool, plugin, "rank", "Rank", None, None).await;
    for _ in 0..3 {
        insert_group(&pool, provider, &Uuid::new_v4(), Some("A")).await;
    }
    for _ in 0..2 {
        insert_group(&pool, provider, &Uuid::new_v4(), Some("B")).await;
    }
    insert_group(&pool, provider, &Uuid::new_v4(), None).await;

    let data = service.server_extension_data(server).await.unwrap();
    let tabs = &find_plugin(&data, "Perms").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].tables.len(), 1);

    let table = &tabs[0].tables[0];
    assert_eq!(table.name, "rank");
    assert_eq!(table.group_column, "Rank");
    assert_eq!(table.players_column, "Players");
    let rows: Vec<(&str, i64)> =
        table.rows.iter().map(|r| (r.group.as_str(), r.players)).collect();
    assert_eq!(rows, vec![("A", 3), ("B", 2)]);
}

#[tokio::test]
async fn server_values_and_aggregates_share_one_tab() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Mixed", &server, None).await;
    let server_side = insert_provider(&pool, plugin, "uptime", "Uptime", None, None).await;
    let player_side = insert_provider(&pool, plugin, "kills", "Kills", None, None).await;
    insert_server_row(&pool, server_side, &server, None, Some(99.9), None, None, None, None).await;
    insert_player_row(&pool, player_side, &Uuid::new_v4(), None, None, None, Some(10), None, None)
        .await;

    let data = service.server_extension_data(server).await.unwrap();
    let tabs = &find_plugin(&data, "Mixed").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].values.len(), 2);
}

#[tokio::test]
async fn players_in_groups_normalizes_null_literal() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Perms", &server, None).await;
    let provider = insert_provider(&pool, plugin, "rank", "Rank", None, None).await;
    let grouped = Uuid::new_v4();
    let ungrouped = Uuid::new_v4();
    let other = Uuid::new_v4();
    insert_group(&pool, provider, &grouped, Some("A")).await;
    insert_group(&pool, provider, &ungrouped, None).await;
    insert_group(&pool, provider, &other, Some("B")).await;

    let named = service.players_in_groups(plugin, "rank", &["A".to_string()]).await.unwrap();
    assert_eq!(named, vec![grouped]);

    let nulls = service.players_in_groups(plugin, "rank", &["null".to_string()]).await.unwrap();
    assert_eq!(nulls, vec![ungrouped]);

    let mixed = service
        .players_in_groups(plugin, "rank", &["A".to_string(), "NULL".to_string()])
        .await
        .unwrap();
    assert_eq!(
        mixed.into_iter().collect::<BTreeSet<_>>(),
        BTreeSet::from([grouped, ungrouped])
    );

    let none = service.players_in_groups(plugin, "rank", &[]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn players_table_respects_recent_scope_and_limit() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Stats", &server, None).await;
    let provider = insert_provider(&pool, plugin, "kills", "Kills", None, None).await;

    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut players = Vec::new();
    for i in 0..5 {
        let player = Uuid::new_v4();
        insert_session(&pool, &player, &server, base + Duration::minutes(i)).await;
        insert_player_row(&pool, provider, &player, None, None, None, Some(i), None, None).await;
        players.push(player);
    }

    let table = service.players_table_data(server, 3).await.unwrap();
    let seen: BTreeSet<Uuid> = table.keys().copied().collect();
    let expected: BTreeSet<Uuid> = players[2..].iter().copied().collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn players_table_merges_values_and_groups() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Perms", &server, None).await;
    let kills = insert_provider(&pool, plugin, "kills", "Kills", None, None).await;
    let rank = insert_provider(&pool, plugin, "rank", "Rank", None, None).await;
    insert_session(&pool, &player, &server, Utc::now()).await;
    insert_player_row(&pool, kills, &player, None, None, None, Some(4), None, None).await;
    insert_group(&pool, rank, &player, Some("Mod")).await;

    let table = service.players_table_data(server, 10).await.unwrap();
    let tab = table.get(&player).expect("recent player present");
    assert_eq!(tab.tab.name, "");
    assert_eq!(
        find_value(tab, "kills").value,
        Value::Number { value: 4, format: FormatKind::None }
    );
    assert_eq!(
        find_value(tab, "rank").value,
        Value::GroupMembership { group: "Mod".to_string() }
    );
}

#[tokio::test]
async fn players_table_skips_unflagged_providers() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Stats", &server, None).await;
    let provider = insert_provider(&pool, plugin, "detail", "Detail", None, None).await;
    set_provider_flags(&pool, provider, false, false).await;
    insert_session(&pool, &player, &server, Utc::now()).await;
    insert_player_row(&pool, provider, &player, None, Some(3.0), None, None, None, None).await;

    // Not flagged for the players table, but still part of the full
    // per-player view.
    let table = service.players_table_data(server, 10).await.unwrap();
    assert!(table.is_empty());

    let data = service.player_extension_data(player).await.unwrap();
    let tabs = &find_plugin(&data, "Stats").tabs;
    assert_eq!(find_value(&tabs[0], "detail").value, Value::Double { value: 3.0 });
}

#[tokio::test]
async fn players_table_empty_without_sessions() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let table = service.players_table_data(Uuid::new_v4(), 25).await.unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn decoder_precedence_applies_to_stored_rows() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Odd", &server, None).await;
    let provider = insert_provider(&pool, plugin, "flag", "Flag", None, None).await;
    // Both columns set: the boolean wins.
    insert_player_row(&pool, provider, &player, Some(true), None, None, None, Some("yes"), None)
        .await;

    let data = service.player_extension_data(player).await.unwrap();
    let tabs = &find_plugin(&data, "Odd").tabs;
    assert_eq!(find_value(&tabs[0], "flag").value, Value::Boolean { value: true });
    assert_eq!(tabs[0].booleans.len(), 1);
    assert!(tabs[0].values.is_empty());
}

#[tokio::test]
async fn player_name_flag_marks_text_values() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Names", &server, None).await;
    let provider = insert_provider(&pool, plugin, "nick", "Nickname", None, None).await;
    set_provider_player_name(&pool, provider).await;
    insert_player_row(&pool, provider, &player, None, None, None, None, Some("Steve"), None).await;

    let data = service.player_extension_data(player).await.unwrap();
    let tabs = &find_plugin(&data, "Names").tabs;
    assert_eq!(
        find_value(&tabs[0], "nick").value,
        Value::Text { value: "Steve".to_string(), is_player_name: true }
    );
}

#[tokio::test]
async fn values_within_tab_ordered_by_priority_then_name() {
    let pool = create_test_db().await;
    let service = ExtensionService::new(pool.clone());

    let server = Uuid::new_v4();
    let player = Uuid::new_v4();
    let plugin = insert_plugin(&pool, "Stats", &server, None).await;
    for (name, priority) in [("low", 10), ("high", 90), ("also_low", 10)] {
        let provider = insert_provider(&pool, plugin, name, name, None, None).await;
        set_provider_priority(&pool, provider, priority).await;
        insert_player_row(&pool, provider, &player, None, Some(1.0), None, None, None, None).await;
    }

    let data = service.player_extension_data(player).await.unwrap();
    let tabs = &find_plugin(&data, "Stats").tabs;
    let names: Vec<&str> = tabs[0].values.iter().map(|v| v.descriptor.name.as_str()).collect();
    assert_eq!(names, vec!["high", "also_low", "low"]);
}
