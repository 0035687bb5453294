//! Rewrites the duplicate pointers of a group around a new main revision.

use std::cell::Cell;

use synclattes_core::{RevisionId, RevisionStore};
use tracing::{debug, error};

use crate::error::{DedupError, Result};

/// Applies group reassignments and guards the one-level pointer invariant.
///
/// The store is verified before the first write, so a store that already holds
/// chained pointers is never modified. After the first integrity violation the
/// reassigner is halted and refuses further work. Build a new one once the data has
/// been repaired.
pub struct Reassigner<'s, S: RevisionStore + ?Sized> {
    store: &'s S,
    halted: Cell<bool>,
    verified: Cell<bool>,
}

impl<'s, S: RevisionStore + ?Sized> Reassigner<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            halted: Cell::new(false),
            verified: Cell::new(false),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.get()
    }

    /// Makes `main` the main revision of `group`.
    ///
    /// Every other member, and every revision currently pointing at one of them, ends
    /// up pointing at `main`; `main` itself points nowhere. Storage is left untouched if
    /// any step fails. Reassigning an already consistent group is a no-op.
    pub fn reassign(&self, group: &[RevisionId], main: RevisionId) -> Result<()> {
        if self.is_halted() {
            return Err(DedupError::Precondition(
                "reassignment halted after a consistency violation".into(),
            ));
        }
        if group.is_empty() {
            return Err(DedupError::Precondition("group must not be empty".into()));
        }
        if !group.contains(&main) {
            return Err(DedupError::Precondition(format!(
                "main revision {main} is not a member of {group:?}"
            )));
        }
        if !self.verified.get() {
            self.check_group_integrity()?;
        }

        self.store
            .update_duplicate_pointers(group, main)
            .map_err(|source| DedupError::ReassignmentFailed {
                group: group.to_vec(),
                main,
                source,
            })?;
        debug!(main, size = group.len(), "reassigned group");

        self.check_group_integrity()
    }

    /// Fails, and halts the reassigner, when some pointer targets a revision that is
    /// itself a duplicate.
    pub fn check_group_integrity(&self) -> Result<()> {
        let count = self.store.verify_no_chained_duplicates()?;
        if count > 0 {
            self.halted.set(true);
            error!(count, "chained duplicate pointers found, halting reassignment");
            return Err(DedupError::ConsistencyViolation { count });
        }
        self.verified.set(true);
        Ok(())
    }
}
