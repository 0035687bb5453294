use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS researcher (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS researcher_role (
            researcher_id TEXT NOT NULL REFERENCES researcher(id) ON DELETE CASCADE,
            role          TEXT NOT NULL,
            PRIMARY KEY (researcher_id, role)
        );

        CREATE TABLE IF NOT EXISTS item (
            id                 INTEGER PRIMARY KEY,
            researcher_id      TEXT NOT NULL REFERENCES researcher(id),
            seq_prod           INTEGER NOT NULL,
            repo_item_id       INTEGER,
            synced_revision_id INTEGER REFERENCES revision(id),
            skip               INTEGER NOT NULL DEFAULT 0,
            frozen             INTEGER NOT NULL DEFAULT 0,
            UNIQUE (researcher_id, seq_prod)
        );

        CREATE TABLE IF NOT EXISTS revision (
            id              INTEGER PRIMARY KEY,
            item_id         INTEGER NOT NULL REFERENCES item(id),
            retrieval_time  TEXT NOT NULL,
            source          TEXT NOT NULL,
            meta            TEXT,
            duplicate_of_id INTEGER REFERENCES revision(id)
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_item_researcher ON item(researcher_id);
        CREATE INDEX IF NOT EXISTS idx_revision_item ON revision(item_id);
        CREATE INDEX IF NOT EXISTS idx_revision_source ON revision(source);
        CREATE INDEX IF NOT EXISTS idx_revision_duplicate_of ON revision(duplicate_of_id);
        ",
    )?;
    Ok(())
}

/// Newest revision of every item.
pub fn create_last_revision_view(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE VIEW IF NOT EXISTS last_revision AS
            SELECT r.*
            FROM revision r
            WHERE r.id = (SELECT MAX(id) FROM revision WHERE item_id = r.item_id);
        ",
    )?;
    Ok(())
}
