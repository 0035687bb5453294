use std::sync::MutexGuard;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::models::{Revision, RevisionId};
use crate::storage::repositories::{REVISION_COLUMNS, row_to_revision};

/// Which main candidates a group scan should yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilter {
    /// Skip main candidates removed at the source.
    pub exclude_deleted_meta: bool,
    /// Skip main candidates nothing points at.
    pub exclude_single_revisions: bool,
    /// Skip groups whose members are all synchronized at their last revision.
    pub only_pending_sync: bool,
}

impl Default for GroupFilter {
    fn default() -> Self {
        Self {
            exclude_deleted_meta: true,
            exclude_single_revisions: true,
            only_pending_sync: true,
        }
    }
}

/// Reads and writes of the `duplicate_of_id` pointers.
pub struct DuplicateGroupQuery<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> DuplicateGroupQuery<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    /// Main candidates (last revisions without a pointer) with id greater than `after`.
    pub fn main_candidates(
        &self,
        after: RevisionId,
        limit: usize,
        filter: &GroupFilter,
    ) -> Result<Vec<Revision>> {
        let mut sql = format!(
            "SELECT {REVISION_COLUMNS}
             FROM last_revision r
             JOIN item i ON i.id = r.item_id
             WHERE r.duplicate_of_id IS NULL AND r.id > ?1"
        );
        if filter.exclude_deleted_meta {
            sql.push_str(" AND r.meta IS NOT NULL");
        }
        if filter.exclude_single_revisions {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM last_revision d WHERE d.duplicate_of_id = r.id)",
            );
        }
        if filter.only_pending_sync {
            sql.push_str(
                " AND (i.synced_revision_id IS NOT r.id
                       OR EXISTS (SELECT 1 FROM last_revision d
                                  JOIN item di ON di.id = d.item_id
                                  WHERE d.duplicate_of_id = r.id
                                    AND di.synced_revision_id IS NOT d.id))",
            );
        }
        sql.push_str(" ORDER BY r.id LIMIT ?2");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![after, limit as i64], row_to_revision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Last revisions pointing at `main`.
    pub fn duplicates_of(&self, main: RevisionId) -> Result<Vec<Revision>> {
        let sql = format!(
            "SELECT {REVISION_COLUMNS} FROM last_revision r
             WHERE r.duplicate_of_id = ?1 ORDER BY r.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![main], row_to_revision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The stored group `revision` belongs to: its main plus every last revision pointing
    /// at that main. Empty when the revision does not exist.
    pub fn group_of(&self, revision: RevisionId) -> Result<Vec<Revision>> {
        let main: Option<RevisionId> = self
            .conn
            .query_row(
                "SELECT COALESCE(duplicate_of_id, id) FROM revision WHERE id = ?1",
                params![revision],
                |row| row.get(0),
            )
            .optional()?;
        let Some(main) = main else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {REVISION_COLUMNS} FROM last_revision r
             WHERE r.id = ?1 OR r.duplicate_of_id = ?1 OR r.id = ?2
             ORDER BY r.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![main, revision], row_to_revision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Points every id in `ids` except `main`, and everything already pointing at one of
    /// them, to `main`, then clears `main`'s own pointer. All or nothing.
    pub fn update_pointers(&self, ids: &[RevisionId], main: RevisionId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut demote = tx.prepare(
                "UPDATE revision SET duplicate_of_id = ?1 WHERE id = ?2 OR duplicate_of_id = ?2",
            )?;
            for id in ids.iter().copied().filter(|id| *id != main) {
                if demote.execute(params![main, id])? == 0 {
                    return Err(SyncError::RevisionNotFound(id));
                }
            }
        }

        let cleared = tx.execute(
            "UPDATE revision SET duplicate_of_id = NULL WHERE id = ?1",
            params![main],
        )?;
        if cleared == 0 {
            return Err(SyncError::RevisionNotFound(main));
        }

        tx.commit()?;
        Ok(())
    }

    /// Number of revisions pointing at a revision that itself points elsewhere.
    pub fn chained_duplicates(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM revision r
             JOIN revision t ON t.id = r.duplicate_of_id
             WHERE t.duplicate_of_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
