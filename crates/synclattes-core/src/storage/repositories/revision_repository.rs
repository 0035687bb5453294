use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{Metadata, Revision, RevisionId};

use super::Repository;

/// Column list shared by every query returning revisions; the source table is aliased `r`.
pub(crate) const REVISION_COLUMNS: &str =
    "r.id, r.item_id, r.retrieval_time, r.source, r.meta, r.duplicate_of_id";

pub(crate) fn row_to_revision(row: &rusqlite::Row) -> rusqlite::Result<Revision> {
    let retrieval_str: String = row.get(2)?;
    let retrieval_time = DateTime::parse_from_rfc3339(&retrieval_str)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    let meta = row
        .get::<_, Option<String>>(4)?
        .map(|json| serde_json::from_str::<Metadata>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Revision {
        id: row.get(0)?,
        item_id: row.get(1)?,
        retrieval_time,
        source: row.get(3)?,
        meta,
        duplicate_of: row.get(5)?,
    })
}

pub trait RevisionRepository: Repository<Entity = Revision, Id = RevisionId> {
    fn find_many(&self, ids: &[RevisionId]) -> Result<Vec<Revision>>;
}

pub struct SqliteRevisionRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteRevisionRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

impl<'a> Repository for SqliteRevisionRepository<'a> {
    type Entity = Revision;
    type Id = RevisionId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let sql = format!("SELECT {REVISION_COLUMNS} FROM revision r WHERE r.id = ?1");
        let revision = self
            .conn
            .query_row(&sql, params![id], row_to_revision)
            .optional()?;
        Ok(revision)
    }

    fn save(&self, revision: &Self::Entity) -> Result<()> {
        let meta_json = revision
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO revision (id, item_id, retrieval_time, source, meta, duplicate_of_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                item_id = excluded.item_id,
                retrieval_time = excluded.retrieval_time,
                source = excluded.source,
                meta = excluded.meta,
                duplicate_of_id = excluded.duplicate_of_id",
            params![
                revision.id,
                revision.item_id,
                revision.retrieval_time.to_rfc3339(),
                revision.source,
                meta_json,
                revision.duplicate_of,
            ],
        )?;
        Ok(())
    }
}

impl<'a> RevisionRepository for SqliteRevisionRepository<'a> {
    fn find_many(&self, ids: &[RevisionId]) -> Result<Vec<Revision>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {REVISION_COLUMNS} FROM revision r WHERE r.id IN ({placeholders}) ORDER BY r.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), row_to_revision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
