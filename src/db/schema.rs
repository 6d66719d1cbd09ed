//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Local applications, launched as a process
        CREATE TABLE IF NOT EXISTS sys_command (
            id INTEGER PRIMARY KEY,
            name VARCHAR(50) NOT NULL COLLATE NOCASE UNIQUE,
            path VARCHAR(1000) NOT NULL
        );

        -- Websites, opened in the default browser
        CREATE TABLE IF NOT EXISTS web_command (
            id INTEGER PRIMARY KEY,
            name VARCHAR(50) NOT NULL COLLATE NOCASE UNIQUE,
            path VARCHAR(1000) NOT NULL
        );

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1 (command tables)");
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        INSERT OR IGNORE INTO web_command (name, path)
        VALUES ('invest', 'https://univest.in/user/trade/live/stocks?cacheClear=1750658600688');

        PRAGMA user_version = 2;
        ",
    )?;

    tracing::info!("migrated to schema v2 (seed web commands)");
    Ok(())
}
