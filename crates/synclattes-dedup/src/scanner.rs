//! Lazy, batched iteration over stored duplicate groups.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use synclattes_core::{GroupFilter, Revision, RevisionId, RevisionStore};

use crate::error::{DedupError, Result};

/// A main revision and the last revisions pointing at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub main: Revision,
    pub others: Vec<Revision>,
}

impl DuplicateGroup {
    /// Member ids, main first.
    pub fn ids(&self) -> Vec<RevisionId> {
        std::iter::once(self.main.id)
            .chain(self.others.iter().map(|r| r.id))
            .collect()
    }

    pub fn members(&self) -> impl Iterator<Item = &Revision> {
        std::iter::once(&self.main).chain(self.others.iter())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub filter: GroupFilter,
    pub batch_size: usize,
    /// Only groups whose main id is greater than this are yielded.
    pub start_after: Option<RevisionId>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            filter: GroupFilter::default(),
            batch_size: 1024,
            start_after: None,
        }
    }
}

type FetchBatch<'s> =
    Box<dyn FnMut(RevisionId, usize) -> synclattes_core::Result<Vec<Revision>> + 's>;

/// Pages through revisions by strictly increasing id, one fetch per batch.
///
/// Stops after a short or empty batch, and for good after the first error.
pub(crate) struct RevisionBatches<'s> {
    fetch: FetchBatch<'s>,
    batch_size: usize,
    cursor: RevisionId,
    buffer: VecDeque<Revision>,
    exhausted: bool,
}

impl<'s> RevisionBatches<'s> {
    pub(crate) fn new(
        after: Option<RevisionId>,
        batch_size: usize,
        fetch: impl FnMut(RevisionId, usize) -> synclattes_core::Result<Vec<Revision>> + 's,
    ) -> Self {
        Self {
            fetch: Box::new(fetch),
            batch_size: batch_size.max(1),
            cursor: after.unwrap_or(RevisionId::MIN),
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

impl Iterator for RevisionBatches<'_> {
    type Item = Result<Revision>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(revision) = self.buffer.pop_front() {
            return Some(Ok(revision));
        }
        if self.exhausted {
            return None;
        }

        match (self.fetch)(self.cursor, self.batch_size) {
            Err(e) => {
                self.exhausted = true;
                Some(Err(DedupError::Storage(e)))
            }
            Ok(batch) => {
                if batch.len() < self.batch_size {
                    self.exhausted = true;
                }
                if let Some(last) = batch.last() {
                    self.cursor = last.id;
                }
                self.buffer.extend(batch);
                self.buffer.pop_front().map(Ok)
            }
        }
    }
}

/// Iterator returned by [`scan_pending_groups`].
pub struct GroupScanner<'s, S: RevisionStore + ?Sized> {
    store: &'s S,
    candidates: RevisionBatches<'s>,
    visited: HashSet<RevisionId>,
    last_main_id: Option<RevisionId>,
    failed: bool,
}

impl<S: RevisionStore + ?Sized> GroupScanner<'_, S> {
    /// Main id of the last group yielded. Pass it as `start_after` to resume a scan.
    pub fn last_main_id(&self) -> Option<RevisionId> {
        self.last_main_id
    }
}

impl<S: RevisionStore + ?Sized> Iterator for GroupScanner<'_, S> {
    type Item = Result<DuplicateGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let main = match self.candidates.next()? {
                Ok(main) => main,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            if !self.visited.insert(main.id) {
                continue;
            }

            let others = match self.store.fetch_duplicates_of(main.id) {
                Ok(others) => others,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(DedupError::Storage(e)));
                }
            };
            self.visited.extend(others.iter().map(|r| r.id));
            self.last_main_id = Some(main.id);
            tracing::debug!(main = main.id, size = others.len() + 1, "scanned group");

            return Some(Ok(DuplicateGroup { main, others }));
        }
    }
}

/// Stored groups whose main is a last revision with no pointer, in main id order.
///
/// Each group is yielded once per scan. The iterator ends on the first storage error.
pub fn scan_pending_groups<'s, S: RevisionStore + ?Sized>(
    store: &'s S,
    options: ScanOptions,
) -> GroupScanner<'s, S> {
    let filter = options.filter;
    let candidates = RevisionBatches::new(options.start_after, options.batch_size, move |after, limit| {
        store.fetch_main_candidates(after, limit, &filter)
    });

    GroupScanner {
        store,
        candidates,
        visited: HashSet::new(),
        last_main_id: None,
        failed: false,
    }
}
