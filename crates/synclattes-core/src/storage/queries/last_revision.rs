use std::sync::MutexGuard;

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{Revision, RevisionId};
use crate::storage::repositories::{REVISION_COLUMNS, row_to_revision};

/// Batched reads over the newest revision of every item, keyed by revision id.
pub struct LastRevisionQuery<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> LastRevisionQuery<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    /// Last revisions whose item was never synchronized at that revision.
    pub fn pending_sync(&self, after: RevisionId, limit: usize) -> Result<Vec<Revision>> {
        let sql = format!(
            "SELECT {REVISION_COLUMNS}
             FROM last_revision r
             JOIN item i ON i.id = r.item_id
             WHERE i.synced_revision_id IS NOT r.id AND r.id > ?1
             ORDER BY r.id
             LIMIT ?2"
        );
        self.batch(&sql, after, limit)
    }

    /// Last revisions that still carry metadata.
    pub fn with_meta(&self, after: RevisionId, limit: usize) -> Result<Vec<Revision>> {
        let sql = format!(
            "SELECT {REVISION_COLUMNS}
             FROM last_revision r
             WHERE r.meta IS NOT NULL AND r.id > ?1
             ORDER BY r.id
             LIMIT ?2"
        );
        self.batch(&sql, after, limit)
    }

    fn batch(&self, sql: &str, after: RevisionId, limit: usize) -> Result<Vec<Revision>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![after, limit as i64], row_to_revision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
