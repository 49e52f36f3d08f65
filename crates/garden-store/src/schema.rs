use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 2;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS contacts (
            id                    TEXT PRIMARY KEY,
            name                  TEXT NOT NULL,
            last_interaction      TEXT,
            target_frequency_days INTEGER,
            importance            TEXT NOT NULL DEFAULT 'medium',
            created_at            TEXT NOT NULL DEFAULT (date('now'))
        );

        CREATE TABLE IF NOT EXISTS interactions (
            id         TEXT PRIMARY KEY,
            contact_id TEXT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            day        INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_interactions_contact ON interactions(contact_id, day);
        CREATE INDEX IF NOT EXISTS idx_interactions_day ON interactions(day);
        ",
    )?;

    // Add photo_ref to v1 databases that lack it
    if conn
        .prepare("SELECT photo_ref FROM contacts LIMIT 0")
        .is_err()
    {
        conn.execute_batch("ALTER TABLE contacts ADD COLUMN photo_ref TEXT;")?;
        tracing::info!("migrated contacts table: added photo_ref");
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &["metadata", "contacts", "interactions"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "table {table} should be empty");
        }
        // metadata holds the schema version
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_initialize_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_migrates_v1_contacts() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE contacts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                last_interaction TEXT,
                target_frequency_days INTEGER,
                importance TEXT NOT NULL DEFAULT 'medium',
                created_at TEXT NOT NULL DEFAULT (date('now'))
            );
            INSERT INTO contacts (id, name) VALUES ('c1', 'Old Friend');",
        )
        .unwrap();

        initialize(&conn).unwrap();

        let photo: Option<String> = conn
            .query_row("SELECT photo_ref FROM contacts WHERE id = 'c1'", [], |row| row.get(0))
            .unwrap();
        assert!(photo.is_none());
    }
}
