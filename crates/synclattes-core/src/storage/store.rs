use crate::error::Result;
use crate::models::{ItemId, Revision, RevisionId};

use super::queries::GroupFilter;

/// Storage operations the duplicate engine needs.
///
/// Every batched read returns rows ordered by strictly increasing revision id, restricted
/// to ids greater than `after`, at most `limit` rows.
pub trait RevisionStore {
    /// Last revisions whose item is not synchronized at that revision.
    fn fetch_last_revisions_pending_sync(
        &self,
        after: RevisionId,
        limit: usize,
    ) -> Result<Vec<Revision>>;

    /// Last revisions that carry metadata.
    fn fetch_last_revisions_with_meta(
        &self,
        after: RevisionId,
        limit: usize,
    ) -> Result<Vec<Revision>>;

    /// Main candidates (last revisions with no pointer) passing `filter`.
    fn fetch_main_candidates(
        &self,
        after: RevisionId,
        limit: usize,
        filter: &GroupFilter,
    ) -> Result<Vec<Revision>>;

    /// Last revisions whose pointer is `main`.
    fn fetch_duplicates_of(&self, main: RevisionId) -> Result<Vec<Revision>>;

    /// The stored group of `revision` (its main and all last revisions pointing at it).
    fn fetch_group_of(&self, revision: RevisionId) -> Result<Vec<Revision>>;

    fn find_revisions(&self, ids: &[RevisionId]) -> Result<Vec<Revision>>;

    /// Institutional roles of the researcher who declared the item.
    fn researcher_roles(&self, item: ItemId) -> Result<Vec<String>>;

    /// Transactionally points `ids` (and their current duplicates) at `main` and clears
    /// `main`'s pointer.
    fn update_duplicate_pointers(&self, ids: &[RevisionId], main: RevisionId) -> Result<()>;

    /// Number of pointers that target a revision which is itself a duplicate.
    fn verify_no_chained_duplicates(&self) -> Result<usize>;
}
