// Common test utilities and helpers

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::time::Duration;
use uuid::Uuid;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn insert_icon(
    pool: &SqlitePool,
    name: &str,
    family: Option<&str>,
    color: Option<&str>,
) -> i64 {
    sqlx::query("INSERT INTO icon (name, family, color) VALUES (?, ?, ?)")
        .bind(name)
        .bind(family)
        .bind(color)
        .execute(pool)
        .await
        .expect("Failed to insert icon")
        .last_insert_rowid()
}

pub async fn insert_plugin(
    pool: &SqlitePool,
    name: &str,
    server_id: &Uuid,
    icon_id: Option<i64>,
) -> i64 {
    sqlx::query("INSERT INTO plugin (name, server_scope, icon_id) VALUES (?, ?, ?)")
        .bind(name)
        .bind(server_id.to_string())
        .bind(icon_id)
        .execute(pool)
        .await
        .expect("Failed to insert plugin")
        .last_insert_rowid()
}

pub async fn insert_tab(
    pool: &SqlitePool,
    name: Option<&str>,
    priority: Option<i64>,
    element_order: Option<&str>,
) -> i64 {
    sqlx::query("INSERT INTO tab (name, priority, element_order) VALUES (?, ?, ?)")
        .bind(name)
        .bind(priority)
        .bind(element_order)
        .execute(pool)
        .await
        .expect("Failed to insert tab")
        .last_insert_rowid()
}

/// Inserts a visible provider that shows in the players table. Flags,
/// priority and format can be adjusted with the setters below.
pub async fn insert_provider(
    pool: &SqlitePool,
    plugin_id: i64,
    name: &str,
    label_text: &str,
    tab_id: Option<i64>,
    icon_id: Option<i64>,
) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO provider (plugin_id, name, label_text, hidden, show_in_players_table, tab_id, icon_id)
        VALUES (?, ?, ?, 0, 1, ?, ?)
        "#,
    )
    .bind(plugin_id)
    .bind(name)
    .bind(label_text)
    .bind(tab_id)
    .bind(icon_id)
    .execute(pool)
    .await
    .expect("Failed to insert provider")
    .last_insert_rowid()
}

pub async fn set_provider_flags(
    pool: &SqlitePool,
    provider_id: i64,
    hidden: bool,
    show_in_players_table: bool,
) {
    sqlx::query("UPDATE provider SET hidden = ?, show_in_players_table = ? WHERE id = ?")
        .bind(hidden)
        .bind(show_in_players_table)
        .bind(provider_id)
        .execute(pool)
        .await
        .expect("Failed to update provider flags");
}

pub async fn set_provider_priority(pool: &SqlitePool, provider_id: i64, priority: i64) {
    sqlx::query("UPDATE provider SET priority = ? WHERE id = ?")
        .bind(priority)
        .bind(provider_id)
        .execute(pool)
        .await
        .expect("Failed to update provider priority");
}

pub async fn set_provider_format(pool: &SqlitePool, provider_id: i64, format_kind: &str) {
    sqlx::query("UPDATE provider SET format_kind = ? WHERE id = ?")
        .bind(format_kind)
        .bind(provider_id)
        .execute(pool)
        .await
        .expect("Failed to update provider format");
}

pub async fn set_provider_player_name(pool: &SqlitePool, provider_id: i64) {
    sqlx::query("UPDATE provider SET is_player_name = 1 WHERE id = ?")
        .bind(provider_id)
        .execute(pool)
        .await
        .expect("Failed to update provider player-name flag");
}

/// Inserts one player value row with explicit columns; pass None for the
/// columns that should stay null.
#[allow(clippy::too_many_arguments)]
pub async fn insert_player_row(
    pool: &SqlitePool,
    provider_id: i64,
    player_id: &Uuid,
    boolean_value: Option<bool>,
    double_value: Option<f64>,
    percentage_value: Option<f64>,
    number_value: Option<i64>,
    text_value: Option<&str>,
    rich_text_value: Option<&str>,
) {
    sqlx::query(
        r#"
        INSERT INTO player_value
            (provider_id, player_id, boolean_value, double_value, percentage_value,
             number_value, text_value, rich_text_value)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(provider_id)
    .bind(player_id.to_string())
    .bind(boolean_value)
    .bind(double_value)
    .bind(percentage_value)
    .bind(number_value)
    .bind(text_value)
    .bind(rich_text_value)
    .execute(pool)
    .await
    .expect("Failed to insert player value");
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_server_row(
    pool: &SqlitePool,
    provider_id: i64,
    server_id: &Uuid,
    boolean_value: Option<bool>,
    double_value: Option<f64>,
    percentage_value: Option<f64>,
    number_value: Option<i64>,
    text_value: Option<&str>,
    rich_text_value: Option<&str>,
) {
    sqlx::query(
        r#"
        INSERT INTO server_value
            (provider_id, server_id, boolean_value, double_value, percentage_value,
             number_value, text_value, rich_text_value)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(provider_id)
    .bind(server_id.to_string())
    .bind(boolean_value)
    .bind(double_value)
    .bind(percentage_value)
    .bind(number_value)
    .bind(text_value)
    .bind(rich_text_value)
    .execute(pool)
    .await
    .expect("Failed to insert server value");
}

pub async fn insert_group(
    pool: &SqlitePool,
    provider_id: i64,
    player_id: &Uuid,
    group_name: Option<&str>,
) {
    sqlx::query("INSERT INTO group_membership (provider_id, player_id, group_name) VALUES (?, ?, ?)")
        .bind(provider_id)
        .bind(player_id.to_string())
        .bind(group_name)
        .execute(pool)
        .await
        .expect("Failed to insert group membership");
}

pub async fn insert_session(
    pool: &SqlitePool,
    player_id: &Uuid,
    server_id: &Uuid,
    session_end: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO session (player_id, server_id, session_end) VALUES (?, ?, ?)")
        .bind(player_id.to_string())
        .bind(server_id.to_string())
        .bind(session_end)
        .execute(pool)
        .await
        .expect("Failed to insert session");
}
