//! Schema initialisation.

use rusqlite::{Connection, Result};

/// Initialise store tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_contacts_table(conn)?;
    create_custom_messages_table(conn)?;
    create_settings_table(conn)?;
    Ok(())
}

fn create_contacts_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS contacts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number TEXT UNIQUE NOT NULL,
            timezone     TEXT NOT NULL,
            name         TEXT,
            created_at   DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )
}

/// Operator-customized message bodies; the newest row wins.
fn create_custom_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS custom_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            message     TEXT NOT NULL,
            target_date TEXT NOT NULL,
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )
}

fn create_settings_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT
        );",
    )
}
