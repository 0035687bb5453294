//! Choice of the main revision of a duplicate group.

use std::cmp::Reverse;

use synclattes_core::{keys, ElectionConfig, Revision, RevisionId, RevisionStore};

use crate::doi::Doi;
use crate::error::Result;

/// A group member with what the policy needs to know about its declaring researcher.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub revision: Revision,
    pub roles: Vec<String>,
}

impl Candidate {
    pub fn new(revision: Revision, roles: Vec<String>) -> Self {
        Self { revision, roles }
    }

    /// Attaches the researcher roles of each revision's item.
    pub fn load<S: RevisionStore + ?Sized>(
        store: &S,
        revisions: Vec<Revision>,
    ) -> Result<Vec<Candidate>> {
        revisions
            .into_iter()
            .map(|revision| {
                let roles = store.researcher_roles(revision.item_id)?;
                Ok(Candidate::new(revision, roles))
            })
            .collect()
    }
}

/// Orders the members of a group, best main revision first.
pub trait ElectionPolicy {
    /// Every candidate id exactly once, in a deterministic total order.
    fn rank(&self, candidates: &[Candidate]) -> Vec<RevisionId>;

    fn elect(&self, candidates: &[Candidate]) -> Option<RevisionId> {
        self.rank(candidates).first().copied()
    }
}

/// Points-based election: researcher role, DOI, authority ids, relevance flag and
/// metadata completeness.
#[derive(Debug, Clone, Default)]
pub struct ScoreElection {
    config: ElectionConfig,
}

impl ScoreElection {
    pub fn new(config: ElectionConfig) -> Self {
        Self { config }
    }

    /// `None` for a removed revision, which never wins against one with metadata.
    pub fn score(&self, candidate: &Candidate) -> Option<i64> {
        let meta = candidate.revision.meta.as_ref()?;
        let cfg = &self.config;

        let role = candidate
            .roles
            .iter()
            .filter_map(|role| cfg.role_scores.get(role.trim()))
            .copied()
            .max()
            .unwrap_or(0);

        let doi = meta
            .doi()
            .filter(|raw| Doi::parse(raw).is_ok())
            .map_or(0, |_| cfg.doi_score);

        let with_authority = meta
            .values(keys::AUTHOR)
            .iter()
            .filter(|author| author.authority_id().is_some())
            .count() as i64;

        let relevance = if meta.is_relevant() {
            cfg.relevance_flag_score
        } else {
            0
        };

        Some(
            role + doi
                + with_authority * cfg.per_author_with_authority
                + relevance
                + meta.key_count() as i64 * cfg.per_metadata_key,
        )
    }
}

impl ElectionPolicy for ScoreElection {
    fn rank(&self, candidates: &[Candidate]) -> Vec<RevisionId> {
        let mut scored: Vec<(Option<i64>, RevisionId)> = candidates
            .iter()
            .map(|c| (self.score(c), c.revision.id))
            .collect();
        // Option orders None below any Some, so removed revisions sink to the end.
        scored.sort_by_key(|&(score, id)| (Reverse(score), id));
        scored.dedup_by_key(|&mut (_, id)| id);
        scored.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synclattes_core::{Confidence, Metadata, MetadataValue};

    fn candidate(id: RevisionId, meta: Option<Metadata>, roles: &[&str]) -> Candidate {
        Candidate::new(
            Revision::new(id, id, meta),
            roles.iter().map(|r| r.to_string()).collect(),
        )
    }

    fn titled() -> Metadata {
        Metadata::new().with_value(keys::TITLE, "Grafos")
    }

    #[test]
    fn role_dominates() {
        let policy = ScoreElection::default();
        let student = candidate(
            1,
            Some(titled().with_value(keys::DOI, "10.1000/x")),
            &["Aluno de Pós-Graduação - Mestrado"],
        );
        let professor = candidate(2, Some(titled()), &["Professor Ensino Superior"]);
        assert_eq!(policy.rank(&[student, professor]), vec![2, 1]);
    }

    #[test]
    fn best_role_of_the_researcher_counts() {
        let policy = ScoreElection::default();
        let c = candidate(
            1,
            Some(titled()),
            &["Aluno de Pós-Graduação - Mestrado", "Aposentado"],
        );
        assert_eq!(policy.score(&c), Some(1000 + 1));
    }

    #[test]
    fn score_adds_every_signal() {
        let policy = ScoreElection::default();
        let meta = titled()
            .with_value(keys::DOI, "doi:10.1000/x")
            .with_record(
                keys::AUTHOR,
                MetadataValue::new("Ana Lima").with_authority("K1", Confidence::ACCEPTED),
            )
            .with_value(keys::AUTHOR, "Bruno Costa")
            .with_value(keys::RELEVANCE, "sim");
        // title, doi, author, relevance keys
        let c = candidate(1, Some(meta), &["Pesquisador - Pós-Doutorado"]);
        assert_eq!(policy.score(&c), Some(900 + 500 + 50 + 10 + 4));
    }

    #[test]
    fn invalid_doi_earns_nothing() {
        let policy = ScoreElection::default();
        let c = candidate(1, Some(titled().with_value(keys::DOI, "n/a")), &[]);
        assert_eq!(policy.score(&c), Some(2));
    }

    #[test]
    fn ties_break_on_lower_id() {
        let policy = ScoreElection::default();
        let ranked = policy.rank(&[
            candidate(9, Some(titled()), &[]),
            candidate(3, Some(titled()), &[]),
            candidate(5, Some(titled()), &[]),
        ]);
        assert_eq!(ranked, vec![3, 5, 9]);
    }

    #[test]
    fn removed_revisions_rank_last() {
        let policy = ScoreElection::default();
        let ranked = policy.rank(&[
            candidate(1, None, &["Professor Ensino Superior"]),
            candidate(2, Some(Metadata::new()), &[]),
        ]);
        assert_eq!(ranked, vec![2, 1]);
        assert_eq!(policy.elect(&[candidate(1, None, &[])]), Some(1));
        assert_eq!(policy.elect(&[]), None);
    }

    #[test]
    fn custom_weights_apply() {
        let mut config = ElectionConfig::default();
        config.per_metadata_key = 100;
        config.role_scores.clear();
        let policy = ScoreElection::new(config);

        let sparse = candidate(1, Some(titled()), &["Aposentado"]);
        let rich = candidate(2, Some(titled().with_value(keys::TYPE, "Artigo")), &[]);
        assert_eq!(policy.rank(&[sparse, rich]), vec![2, 1]);
    }
}
