//! Schema migrations for the SQLite ledger.
//!
//! Versioned: each migration moves the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{LedgerError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(LedgerError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(LedgerError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per registered repository
        CREATE TABLE repos (
            name TEXT PRIMARY KEY,
            private INTEGER NOT NULL,         -- 0=public, 1=private
            blob_store TEXT NOT NULL,         -- JSON BlobStoreConfig
            registered_at INTEGER NOT NULL
        );

        -- Role grants
        CREATE TABLE members (
            repo TEXT NOT NULL REFERENCES repos(name),
            role TEXT NOT NULL,               -- owner | writer | reader
            principal TEXT NOT NULL,
            PRIMARY KEY (repo, role, principal)
        );

        -- Push records, never updated once written
        CREATE TABLE pushes (
            repo TEXT NOT NULL REFERENCES repos(name),
            tag TEXT NOT NULL,
            head BLOB NOT NULL,               -- 32 bytes
            pack_key TEXT NOT NULL,
            previous_head BLOB,               -- 32 bytes, NULL for the first push
            envelope INTEGER,                 -- EnvelopeFormat as u8, NULL when public
            pushed_at INTEGER NOT NULL,
            PRIMARY KEY (repo, tag, head)
        );

        -- Current head per stream
        CREATE TABLE heads (
            repo TEXT NOT NULL REFERENCES repos(name),
            tag TEXT NOT NULL,
            head BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (repo, tag)
        );

        -- Wrapped copies of a private repository's secret
        CREATE TABLE wrapped_keys (
            repo TEXT NOT NULL REFERENCES repos(name),
            principal TEXT NOT NULL,
            public_key BLOB NOT NULL,         -- 32 bytes, X25519
            encrypted_secret BLOB NOT NULL,
            PRIMARY KEY (repo, principal)
        );

        CREATE INDEX idx_pushes_stream ON pushes(repo, tag, pushed_at);
        "#,
    )?;

    Ok(())
}

pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["repos", "members", "pushes", "heads", "wrapped_keys", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            [CURRENT_VERSION + 1],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(LedgerError::Migration(_))));
    }
}
