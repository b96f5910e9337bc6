use chrono::Utc;
use rusqlite::{Connection, Row};
use tracing::info;

use crate::error::AppResult;

const USER_VERSION: i32 = 2;

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(conn, 1, "Add key-value store for client history")?;
    }

    if current_version < 2 {
        info!(target: "app::db", version = current_version, "running migration v2");
        migrate_to_v2(conn)?;
        current_version = 2;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(conn, 2, "Track write revisions on key-value entries")?;
    }

    if current_version != USER_VERSION {
        conn.execute(&format!("PRAGMA user_version = {}", USER_VERSION), [])?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, description: &str) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"
            INSERT OR REPLACE INTO migration_history (version, description, applied_at)
            VALUES (?, ?, ?)
        "#,
        (version, description, now),
    )?;
    Ok(())
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;
    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    ensure_column(conn, "kv_store", "revision", "INTEGER NOT NULL DEFAULT 0")?;
    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> AppResult<()> {
    if !column_exists(conn, table, column)? {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition};");
        conn.execute(&sql, [])?;
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let pragma = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        if equals_name(row, column)? {
            return Ok(true);
        }
    }

    Ok(false)
}

fn equals_name(row: &Row<'_>, column: &str) -> Result<bool, rusqlite::Error> {
    let name: String = row.get(1)?;
    Ok(name.eq_ignore_ascii_case(column))
}
