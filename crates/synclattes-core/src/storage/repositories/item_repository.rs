use std::sync::MutexGuard;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, SyncError};
use crate::models::{Item, ItemId, RevisionId};

use super::Repository;

pub trait ItemRepository: Repository<Entity = Item, Id = ItemId> {
    fn mark_synced(&self, id: ItemId, revision_id: RevisionId) -> Result<()>;
}

pub struct SqliteItemRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteItemRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            researcher_id: row.get(1)?,
            seq_prod: row.get(2)?,
            repo_item_id: row.get(3)?,
            synced_revision_id: row.get(4)?,
            skip: row.get(5)?,
            frozen: row.get(6)?,
        })
    }
}

impl<'a> Repository for SqliteItemRepository<'a> {
    type Entity = Item;
    type Id = ItemId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, researcher_id, seq_prod, repo_item_id, synced_revision_id, skip, frozen
                 FROM item WHERE id = ?1",
                params![id],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    fn save(&self, item: &Self::Entity) -> Result<()> {
        self.conn.execute(
            "INSERT INTO item (id, researcher_id, seq_prod, repo_item_id, synced_revision_id, skip, frozen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                researcher_id = excluded.researcher_id,
                seq_prod = excluded.seq_prod,
                repo_item_id = excluded.repo_item_id,
                synced_revision_id = excluded.synced_revision_id,
                skip = excluded.skip,
                frozen = excluded.frozen",
            params![
                item.id,
                item.researcher_id,
                item.seq_prod,
                item.repo_item_id,
                item.synced_revision_id,
                item.skip,
                item.frozen,
            ],
        )?;
        Ok(())
    }
}

impl<'a> ItemRepository for SqliteItemRepository<'a> {
    fn mark_synced(&self, id: ItemId, revision_id: RevisionId) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE item SET synced_revision_id = ?1 WHERE id = ?2",
            params![revision_id, id],
        )?;
        if updated == 0 {
            return Err(SyncError::ItemNotFound(id));
        }
        Ok(())
    }
}
