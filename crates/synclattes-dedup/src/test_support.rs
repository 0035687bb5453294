//! Fixtures shared by the unit tests of this crate.

use std::cell::Cell;

use synclattes_core::{
    keys, Database, GroupFilter, Item, ItemId, Metadata, Researcher, Revision, RevisionId,
    RevisionStore, SyncError,
};

pub const RESEARCHER: &str = "r1";

/// Stores a revision under an item of the same id, declared by [`RESEARCHER`].
pub fn add_revision(
    db: &Database,
    id: RevisionId,
    meta: Option<Metadata>,
    duplicate_of: Option<RevisionId>,
) {
    add_revision_for(db, RESEARCHER, &[], id, id, meta, duplicate_of);
}

pub fn add_revision_for(
    db: &Database,
    researcher: &str,
    roles: &[&str],
    item: ItemId,
    id: RevisionId,
    meta: Option<Metadata>,
    duplicate_of: Option<RevisionId>,
) {
    let mut person = Researcher::new(researcher, researcher);
    for role in roles {
        person = person.with_role(*role);
    }
    db.upsert_researcher(&person).unwrap();
    db.upsert_item(&Item::new(item, researcher, item as i32)).unwrap();

    let mut revision = Revision::new(id, item, meta).with_source("lattes");
    revision.duplicate_of = duplicate_of;
    db.upsert_revision(&revision).unwrap();
}

pub fn production(title: &str, authors: &[&str], issued: &str) -> Metadata {
    let mut meta = Metadata::new()
        .with_value(keys::TITLE, title)
        .with_value(keys::DATE_ISSUED, issued);
    for author in authors {
        meta = meta.with_value(keys::AUTHOR, *author);
    }
    meta
}

pub fn pointer(db: &Database, id: RevisionId) -> Option<RevisionId> {
    db.get_revision(id).unwrap().unwrap().duplicate_of
}

/// A [`Database`] that fails selected calls.
pub struct FlakyStore {
    inner: Database,
    fail_duplicates_of: Option<RevisionId>,
    fail_updates: Cell<bool>,
    /// Main candidate fetches that succeed before every later one fails.
    candidate_fetches_left: Option<Cell<usize>>,
}

impl FlakyStore {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            fail_duplicates_of: None,
            fail_updates: Cell::new(false),
            candidate_fetches_left: None,
        }
    }

    pub fn fail_duplicates_of(mut self, main: RevisionId) -> Self {
        self.fail_duplicates_of = Some(main);
        self
    }

    pub fn fail_main_candidates_after(mut self, fetches: usize) -> Self {
        self.candidate_fetches_left = Some(Cell::new(fetches));
        self
    }

    pub fn fail_updates(self) -> Self {
        self.fail_updates.set(true);
        self
    }

    pub fn inner(&self) -> &Database {
        &self.inner
    }
}

fn injected() -> SyncError {
    SyncError::ValidationError("injected failure".into())
}

impl RevisionStore for FlakyStore {
    fn fetch_last_revisions_pending_sync(
        &self,
        after: RevisionId,
        limit: usize,
    ) -> synclattes_core::Result<Vec<Revision>> {
        self.inner.fetch_last_revisions_pending_sync(after, limit)
    }

    fn fetch_last_revisions_with_meta(
        &self,
        after: RevisionId,
        limit: usize,
    ) -> synclattes_core::Result<Vec<Revision>> {
        self.inner.fetch_last_revisions_with_meta(after, limit)
    }

    fn fetch_main_candidates(
        &self,
        after: RevisionId,
        limit: usize,
        filter: &GroupFilter,
    ) -> synclattes_core::Result<Vec<Revision>> {
        if let Some(left) = &self.candidate_fetches_left {
            if left.get() == 0 {
                return Err(injected());
            }
            left.set(left.get() - 1);
        }
        self.inner.fetch_main_candidates(after, limit, filter)
    }

    fn fetch_duplicates_of(&self, main: RevisionId) -> synclattes_core::Result<Vec<Revision>> {
        if self.fail_duplicates_of == Some(main) {
            return Err(injected());
        }
        self.inner.fetch_duplicates_of(main)
    }

    fn fetch_group_of(&self, revision: RevisionId) -> synclattes_core::Result<Vec<Revision>> {
        self.inner.fetch_group_of(revision)
    }

    fn find_revisions(&self, ids: &[RevisionId]) -> synclattes_core::Result<Vec<Revision>> {
        self.inner.find_revisions(ids)
    }

    fn researcher_roles(&self, item: ItemId) -> synclattes_core::Result<Vec<String>> {
        self.inner.researcher_roles(item)
    }

    fn update_duplicate_pointers(
        &self,
        ids: &[RevisionId],
        main: RevisionId,
    ) -> synclattes_core::Result<()> {
        if self.fail_updates.get() {
            return Err(injected());
        }
        self.inner.update_duplicate_pointers(ids, main)
    }

    fn verify_no_chained_duplicates(&self) -> synclattes_core::Result<usize> {
        self.inner.verify_no_chained_duplicates()
    }
}
