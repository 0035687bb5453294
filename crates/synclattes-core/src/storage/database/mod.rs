mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{get_applied_versions, run_migrations, Migration};
pub use schema::SCHEMA_VERSION;

use std::path::Path;

use crate::error::Result;
use crate::models::{Item, ItemId, Researcher, Revision, RevisionId};

use super::queries::{DuplicateGroupQuery, GroupFilter, LastRevisionQuery};
use super::repositories::{
    ItemRepository, Repository, ResearcherRepository, RevisionRepository, SqliteItemRepository,
    SqliteResearcherRepository, SqliteRevisionRepository,
};
use super::store::RevisionStore;

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// SQLite-backed storage context. Passed explicitly to every engine operation.
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }

    pub fn schema_versions(&self) -> Result<Vec<u32>> {
        let conn = self.pool.get_connection();
        get_applied_versions(&conn)
    }

    // ─── Researchers / items / revisions ───────────────────

    pub fn upsert_researcher(&self, researcher: &Researcher) -> Result<()> {
        let conn = self.pool.get_connection();
        SqliteResearcherRepository::new(conn).save(researcher)
    }

    pub fn get_researcher(&self, id: &str) -> Result<Option<Researcher>> {
        let conn = self.pool.get_connection();
        SqliteResearcherRepository::new(conn).find_by_id(&id.to_string())
    }

    pub fn upsert_item(&self, item: &Item) -> Result<()> {
        let conn = self.pool.get_connection();
        SqliteItemRepository::new(conn).save(item)
    }

    pub fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let conn = self.pool.get_connection();
        SqliteItemRepository::new(conn).find_by_id(&id)
    }

    /// Records that `revision_id` has been synchronized downstream for `item_id`.
    pub fn mark_synced(&self, item_id: ItemId, revision_id: RevisionId) -> Result<()> {
        let conn = self.pool.get_connection();
        SqliteItemRepository::new(conn).mark_synced(item_id, revision_id)
    }

    pub fn upsert_revision(&self, revision: &Revision) -> Result<()> {
        let conn = self.pool.get_connection();
        SqliteRevisionRepository::new(conn).save(revision)
    }

    pub fn get_revision(&self, id: RevisionId) -> Result<Option<Revision>> {
        let conn = self.pool.get_connection();
        SqliteRevisionRepository::new(conn).find_by_id(&id)
    }
}

impl RevisionStore for Database {
    fn fetch_last_revisions_pending_sync(
        &self,
        after: RevisionId,
        limit: usize,
    ) -> Result<Vec<Revision>> {
        let conn = self.pool.get_connection();
        LastRevisionQuery::new(conn).pending_sync(after, limit)
    }

    fn fetch_last_revisions_with_meta(
        &self,
        after: RevisionId,
        limit: usize,
    ) -> Result<Vec<Revision>> {
        let conn = self.pool.get_connection();
        LastRevisionQuery::new(conn).with_meta(after, limit)
    }

    fn fetch_main_candidates(
        &self,
        after: RevisionId,
        limit: usize,
        filter: &GroupFilter,
    ) -> Result<Vec<Revision>> {
        let conn = self.pool.get_connection();
        DuplicateGroupQuery::new(conn).main_candidates(after, limit, filter)
    }

    fn fetch_duplicates_of(&self, main: RevisionId) -> Result<Vec<Revision>> {
        let conn = self.pool.get_connection();
        DuplicateGroupQuery::new(conn).duplicates_of(main)
    }

    fn fetch_group_of(&self, revision: RevisionId) -> Result<Vec<Revision>> {
        let conn = self.pool.get_connection();
        DuplicateGroupQuery::new(conn).group_of(revision)
    }

    fn find_revisions(&self, ids: &[RevisionId]) -> Result<Vec<Revision>> {
        let conn = self.pool.get_connection();
        SqliteRevisionRepository::new(conn).find_many(ids)
    }

    fn researcher_roles(&self, item: ItemId) -> Result<Vec<String>> {
        let conn = self.pool.get_connection();
        SqliteResearcherRepository::new(conn).roles_for_item(item)
    }

    fn update_duplicate_pointers(&self, ids: &[RevisionId], main: RevisionId) -> Result<()> {
        let conn = self.pool.get_connection();
        DuplicateGroupQuery::new(conn).update_pointers(ids, main)
    }

    fn verify_no_chained_duplicates(&self) -> Result<usize> {
        let conn = self.pool.get_connection();
        DuplicateGroupQuery::new(conn).chained_duplicates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::models::{keys, Metadata};

    fn meta(title: &str) -> Option<Metadata> {
        Some(Metadata::new().with_value(keys::TITLE, title))
    }

    /// One researcher, one item per revision id, revision id == item id.
    fn seed(db: &Database, revisions: &[(RevisionId, Option<RevisionId>)]) {
        db.upsert_researcher(&Researcher::new("r1", "Researcher One").with_role("Aposentado"))
            .unwrap();
        for (id, dup) in revisions {
            db.upsert_item(&Item::new(*id, "r1", *id as i32)).unwrap();
            let mut rev = Revision::new(*id, *id, meta("t")).with_source("lattes");
            rev.duplicate_of = *dup;
            db.upsert_revision(&rev).unwrap();
        }
    }

    #[test]
    fn revision_roundtrip_preserves_meta_and_pointer() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, Some(1))]);

        let rev = db.get_revision(2).unwrap().unwrap();
        assert_eq!(rev.duplicate_of, Some(1));
        assert_eq!(rev.meta.unwrap().title(), Some("t"));
        assert_eq!(rev.source, "lattes");
        assert!(db.get_revision(99).unwrap().is_none());
    }

    #[test]
    fn researcher_roles_resolve_through_item() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None)]);
        assert_eq!(db.researcher_roles(1).unwrap(), vec!["Aposentado".to_string()]);
        assert!(db.researcher_roles(42).unwrap().is_empty());

        let researcher = db.get_researcher("r1").unwrap().unwrap();
        assert_eq!(researcher.roles, vec!["Aposentado".to_string()]);
    }

    #[test]
    fn last_revision_view_keeps_newest_per_item() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None)]);
        db.upsert_revision(&Revision::new(5, 1, None)).unwrap();

        let pending = db.fetch_last_revisions_pending_sync(0, 10).unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5]);
        assert!(db.fetch_last_revisions_with_meta(0, 10).unwrap().is_empty());
    }

    #[test]
    fn pending_sync_excludes_synced_items() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, None), (3, None)]);
        db.mark_synced(2, 2).unwrap();
        assert_eq!(db.get_item(2).unwrap().unwrap().synced_revision_id, Some(2));

        let pending = db.fetch_last_revisions_pending_sync(0, 10).unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);

        let after = db.fetch_last_revisions_pending_sync(1, 1).unwrap();
        assert_eq!(after.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);

        assert!(matches!(db.mark_synced(77, 1), Err(SyncError::ItemNotFound(77))));
    }

    #[test]
    fn group_of_resolves_main() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, Some(1)), (3, Some(1)), (4, None)]);

        let ids = |revs: Vec<Revision>| revs.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(db.fetch_group_of(2).unwrap()), vec![1, 2, 3]);
        assert_eq!(ids(db.fetch_group_of(1).unwrap()), vec![1, 2, 3]);
        assert_eq!(ids(db.fetch_group_of(4).unwrap()), vec![4]);
        assert!(db.fetch_group_of(99).unwrap().is_empty());
    }

    #[test]
    fn update_pointers_absorbs_subgroups() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, Some(1)), (3, None)]);

        db.update_duplicate_pointers(&[1, 2, 3], 3).unwrap();

        assert_eq!(db.get_revision(1).unwrap().unwrap().duplicate_of, Some(3));
        assert_eq!(db.get_revision(2).unwrap().unwrap().duplicate_of, Some(3));
        assert_eq!(db.get_revision(3).unwrap().unwrap().duplicate_of, None);
        assert_eq!(db.verify_no_chained_duplicates().unwrap(), 0);
    }

    #[test]
    fn update_pointers_rolls_back_on_unknown_member() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, None)]);

        let err = db.update_duplicate_pointers(&[1, 404, 2], 2).unwrap_err();
        assert!(matches!(err, SyncError::RevisionNotFound(404)));
        assert_eq!(db.get_revision(1).unwrap().unwrap().duplicate_of, None);
    }

    #[test]
    fn chained_pointers_are_counted() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, Some(1)), (3, Some(2))]);
        assert_eq!(db.verify_no_chained_duplicates().unwrap(), 1);
    }

    #[test]
    fn main_candidates_honour_filter() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, &[(1, None), (2, Some(1)), (3, None)]);
        db.upsert_item(&Item::new(4, "r1", 4)).unwrap();
        db.upsert_revision(&Revision::new(4, 4, None)).unwrap();

        let ids = |filter: GroupFilter| {
            db.fetch_main_candidates(0, 10, &filter)
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(GroupFilter::default()), vec![1]);
        let everything = GroupFilter {
            exclude_deleted_meta: false,
            exclude_single_revisions: false,
            only_pending_sync: false,
        };
        assert_eq!(ids(everything), vec![1, 3, 4]);

        db.mark_synced(1, 1).unwrap();
        assert_eq!(ids(GroupFilter::default()), vec![1]);
        db.mark_synced(2, 2).unwrap();
        assert!(ids(GroupFilter::default()).is_empty());
    }
}
