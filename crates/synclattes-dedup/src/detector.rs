//! Duplicate detection and main re-election passes.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use synclattes_core::{DedupConfig, Metadata, Revision, RevisionId, RevisionStore};
use tracing::{debug, info, warn};

use crate::authors::{author_set_distance, Author};
use crate::election::{Candidate, ElectionPolicy, ScoreElection};
use crate::error::Result;
use crate::normalize::{normalize, NormLevel};
use crate::reassign::Reassigner;
use crate::scanner::{scan_pending_groups, RevisionBatches, ScanOptions};
use crate::title_index::{NgramTitleIndex, TitleIndex};

/// Counters of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    /// Pending last revisions looked at by detection.
    pub revisions_examined: usize,
    /// Groups confirmed by detection.
    pub groups_formed: usize,
    /// Stored groups visited by re-election.
    pub groups_scanned: usize,
    /// Groups whose main changed during re-election.
    pub groups_reelected: usize,
    /// Pointer rewrites written to storage.
    pub reassignments: usize,
}

impl DedupReport {
    pub fn absorb(&mut self, other: DedupReport) {
        self.revisions_examined += other.revisions_examined;
        self.groups_formed += other.groups_formed;
        self.groups_scanned += other.groups_scanned;
        self.groups_reelected += other.groups_reelected;
        self.reassignments += other.reassignments;
    }
}

/// Finds duplicate productions among pending revisions and keeps their groups elected.
///
/// Only one pass should run against a store at a time.
pub struct Deduplicator<'s, S: RevisionStore + ?Sized, P: ElectionPolicy = ScoreElection> {
    store: &'s S,
    config: DedupConfig,
    policy: P,
    reassigner: Reassigner<'s, S>,
}

impl<'s, S: RevisionStore + ?Sized, P: ElectionPolicy> Deduplicator<'s, S, P> {
    pub fn new(store: &'s S, config: DedupConfig, policy: P) -> Self {
        Self {
            store,
            config,
            policy,
            reassigner: Reassigner::new(store),
        }
    }

    pub fn reassigner(&self) -> &Reassigner<'s, S> {
        &self.reassigner
    }

    /// Detection followed by re-election.
    pub fn run(&self) -> Result<DedupReport> {
        let mut report = self.detect()?;
        report.absorb(self.reelect()?);
        Ok(report)
    }

    /// Groups every pending revision with the stored productions it duplicates.
    pub fn detect(&self) -> Result<DedupReport> {
        self.reassigner.check_group_integrity()?;
        let index = self.build_title_index()?;
        let mut report = DedupReport::default();
        let mut visited: HashSet<RevisionId> = HashSet::new();

        let pending = RevisionBatches::new(None, self.config.batch_size, |after, limit| {
            self.store.fetch_last_revisions_pending_sync(after, limit)
        });

        for revision in pending {
            let revision = revision?;
            report.revisions_examined += 1;

            if visited.contains(&revision.id) {
                continue;
            }
            let Some(meta) = revision.meta.as_ref() else {
                debug!(revision = revision.id, "skipping removed revision");
                continue;
            };
            let Some(title) = comparable_title(meta) else {
                warn!(revision = revision.id, "revision has no usable title");
                continue;
            };

            let hits: Vec<RevisionId> = index
                .find_similar(&title, self.config.title_threshold)
                .into_iter()
                .filter(|id| *id != revision.id)
                .collect();
            if hits.is_empty() {
                continue;
            }

            let confirmed: Vec<RevisionId> = self
                .store
                .find_revisions(&hits)?
                .into_iter()
                .filter(|candidate| self.is_duplicate(&revision, candidate))
                .map(|candidate| candidate.id)
                .collect();
            if confirmed.is_empty() {
                continue;
            }

            let mut members: BTreeMap<RevisionId, Revision> = BTreeMap::new();
            for id in std::iter::once(revision.id).chain(confirmed) {
                for member in self.store.fetch_group_of(id)? {
                    members.entry(member.id).or_insert(member);
                }
            }
            visited.extend(members.keys().copied());
            if members.len() < 2 {
                continue;
            }

            report.groups_formed += 1;
            if self.elect_and_assign(members.into_values().collect())? {
                report.reassignments += 1;
            }
        }

        info!(
            examined = report.revisions_examined,
            groups = report.groups_formed,
            reassignments = report.reassignments,
            "detection pass finished"
        );
        Ok(report)
    }

    /// Re-ranks every pending stored group and moves the main when the ranking changed.
    pub fn reelect(&self) -> Result<DedupReport> {
        self.reassigner.check_group_integrity()?;
        let mut report = DedupReport::default();
        let options = ScanOptions {
            batch_size: self.config.batch_size,
            ..ScanOptions::default()
        };

        for group in scan_pending_groups(self.store, options) {
            let group = group?;
            report.groups_scanned += 1;

            let stored_main = group.main.id;
            let candidates = Candidate::load(self.store, group.members().cloned().collect())?;
            let Some(elected) = self.policy.elect(&candidates) else {
                continue;
            };
            if elected == stored_main {
                continue;
            }

            debug!(from = stored_main, to = elected, "re-electing group main");
            self.reassigner.reassign(&group.ids(), elected)?;
            report.groups_reelected += 1;
            report.reassignments += 1;
        }

        info!(
            scanned = report.groups_scanned,
            reelected = report.groups_reelected,
            "re-election pass finished"
        );
        Ok(report)
    }

    fn build_title_index(&self) -> Result<NgramTitleIndex> {
        let mut index = NgramTitleIndex::new(self.config.title_ngram);
        let with_meta = RevisionBatches::new(None, self.config.batch_size, |after, limit| {
            self.store.fetch_last_revisions_with_meta(after, limit)
        });

        for revision in with_meta {
            let revision = revision?;
            if let Some(title) = revision.meta.as_ref().and_then(comparable_title) {
                index.insert(revision.id, &title);
            }
        }
        debug!(titles = index.len(), "title index built");
        Ok(index)
    }

    /// Year, type and author checks of a title-index hit.
    fn is_duplicate(&self, revision: &Revision, candidate: &Revision) -> bool {
        let (Some(a), Some(b)) = (revision.meta.as_ref(), candidate.meta.as_ref()) else {
            return false;
        };

        if self.config.same_year && a.year() != b.year() {
            return false;
        }
        if let (Some(ta), Some(tb)) = (a.doc_type(), b.doc_type())
            && normalize(ta, NormLevel::None) != normalize(tb, NormLevel::None)
        {
            return false;
        }

        let authors_a = Author::from_metadata(a);
        let authors_b = Author::from_metadata(b);
        if authors_a.is_empty() || authors_b.is_empty() {
            return false;
        }
        match author_set_distance(&authors_a, &authors_b) {
            Ok(distance) => distance <= self.config.author_threshold,
            Err(e) => {
                warn!(a = revision.id, b = candidate.id, error = %e, "author comparison failed");
                false
            }
        }
    }

    /// Elects the main of `members` and rewrites pointers unless they already agree.
    fn elect_and_assign(&self, members: Vec<Revision>) -> Result<bool> {
        let ids: Vec<RevisionId> = members.iter().map(|r| r.id).collect();
        let already: Vec<(RevisionId, Option<RevisionId>)> =
            members.iter().map(|r| (r.id, r.duplicate_of)).collect();

        let candidates = Candidate::load(self.store, members)?;
        let Some(main) = self.policy.elect(&candidates) else {
            return Ok(false);
        };

        let consistent = already.iter().all(|&(id, pointer)| {
            if id == main {
                pointer.is_none()
            } else {
                pointer == Some(main)
            }
        });
        if consistent {
            debug!(main, size = ids.len(), "group already assigned");
            return Ok(false);
        }

        self.reassigner.reassign(&ids, main)?;
        Ok(true)
    }
}

fn comparable_title(meta: &Metadata) -> Option<String> {
    let title = normalize(meta.title()?, NormLevel::LettersAndSpaces);
    (!title.is_empty()).then_some(title)
}
