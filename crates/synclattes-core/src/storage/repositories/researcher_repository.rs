use std::sync::MutexGuard;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{ItemId, Researcher};

use super::Repository;

pub trait ResearcherRepository: Repository<Entity = Researcher, Id = String> {
    /// Roles of the researcher owning the item, sorted by name.
    fn roles_for_item(&self, item_id: ItemId) -> Result<Vec<String>>;
}

pub struct SqliteResearcherRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteResearcherRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn roles(&self, researcher_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT role FROM researcher_role WHERE researcher_id = ?1 ORDER BY role")?;
        let rows = stmt
            .query_map(params![researcher_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl<'a> Repository for SqliteResearcherRepository<'a> {
    type Entity = Researcher;
    type Id = String;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, name FROM researcher WHERE id = ?1",
                params![id],
                |row| Ok(Researcher::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match found {
            Some(mut researcher) => {
                researcher.roles = self.roles(&researcher.id)?;
                Ok(Some(researcher))
            }
            None => Ok(None),
        }
    }

    fn save(&self, researcher: &Self::Entity) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO researcher (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![researcher.id, researcher.name],
        )?;
        tx.execute(
            "DELETE FROM researcher_role WHERE researcher_id = ?1",
            params![researcher.id],
        )?;
        for role in &researcher.roles {
            tx.execute(
                "INSERT OR IGNORE INTO researcher_role (researcher_id, role) VALUES (?1, ?2)",
                params![researcher.id, role],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl<'a> ResearcherRepository for SqliteResearcherRepository<'a> {
    fn roles_for_item(&self, item_id: ItemId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT rr.role
             FROM item i
             JOIN researcher_role rr ON rr.researcher_id = i.researcher_id
             WHERE i.id = ?1
             ORDER BY rr.role",
        )?;
        let rows = stmt
            .query_map(params![item_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
