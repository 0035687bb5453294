//! Distance between the author lists of two productions.

use std::collections::HashSet;

use synclattes_core::{keys, Metadata};

use crate::error::{DedupError, Result};
use crate::names::{levenshtein, reorder_name};
use crate::normalize::{normalize, NormLevel};

/// One author as declared in a production's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Name in citation form, e.g. "SILVA, J.".
    pub citation_name: String,
    pub full_name: String,
    pub authority_id: Option<String>,
}

impl Author {
    pub fn new(full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        Self {
            citation_name: full_name.clone(),
            full_name,
            authority_id: None,
        }
    }

    pub fn with_citation_name(mut self, citation_name: impl Into<String>) -> Self {
        self.citation_name = citation_name.into();
        self
    }

    pub fn with_authority_id(mut self, id: impl Into<String>) -> Self {
        self.authority_id = Some(id.into());
        self
    }

    /// Authors of `meta`, in declaration order.
    ///
    /// Citation names are read from the private citation key, position by position.
    /// Authors without one fall back to their full name.
    pub fn from_metadata(meta: &Metadata) -> Vec<Author> {
        let citations = meta.values(keys::AUTHOR_CITATION);
        meta.values(keys::AUTHOR)
            .iter()
            .enumerate()
            .map(|(idx, author)| {
                let full_name = author.value.trim().to_string();
                let citation_name = citations
                    .get(idx)
                    .map(|c| c.value.trim())
                    .filter(|c| !c.is_empty())
                    .map_or_else(|| full_name.clone(), str::to_string);
                Author {
                    citation_name,
                    full_name,
                    authority_id: author.authority_id().map(str::to_string),
                }
            })
            .collect()
    }
}

/// Normalized distance between two author lists. `0.0` means every author was matched.
///
/// Authors sharing an authority id are paired up front. The rest are matched greedily
/// by name, once on citation names and once on full names, keeping the better total.
/// When both lists have the same length the first one drives the matching, so the
/// result is not guaranteed to be symmetric in that case.
pub fn author_set_distance(a: &[Author], b: &[Author]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(DedupError::Precondition(
            "author lists must not be empty".into(),
        ));
    }

    let ids_a = authority_ids(a);
    let ids_b = authority_ids(b);
    let common: HashSet<&str> = ids_a.intersection(&ids_b).copied().collect();

    let rest_a = without_ids(a, &common);
    let rest_b = without_ids(b, &common);

    let by_citation = greedy_distance(
        &comparable_names(&rest_a, |author| author.citation_name.as_str()),
        &comparable_names(&rest_b, |author| author.citation_name.as_str()),
    );
    let by_full_name = greedy_distance(
        &comparable_names(&rest_a, |author| author.full_name.as_str()),
        &comparable_names(&rest_b, |author| author.full_name.as_str()),
    );

    Ok(by_citation.min(by_full_name) / a.len().min(b.len()) as f64)
}

fn authority_ids(authors: &[Author]) -> HashSet<&str> {
    authors
        .iter()
        .filter_map(|author| author.authority_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect()
}

fn without_ids<'a>(authors: &'a [Author], ids: &HashSet<&str>) -> Vec<&'a Author> {
    authors
        .iter()
        .filter(|author| {
            author
                .authority_id
                .as_deref()
                .is_none_or(|id| !ids.contains(id.trim()))
        })
        .collect()
}

fn comparable_names(authors: &[&Author], name: impl Fn(&Author) -> &str) -> Vec<String> {
    authors
        .iter()
        .map(|author| normalize(&reorder_name(name(author)), NormLevel::LettersOnly))
        .filter(|normalized| !normalized.is_empty())
        .collect()
}

/// Sum of length-relative edit distances of a greedy one-to-one pairing.
///
/// The shorter list (the first one on equal lengths) scans; each of its names takes the
/// closest remaining name of the other list, the earliest one on ties.
fn greedy_distance(a: &[String], b: &[String]) -> f64 {
    let (scanner, candidates) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut total = 0.0;

    for name in scanner {
        let best = remaining
            .iter()
            .enumerate()
            .map(|(slot, &idx)| (slot, idx, levenshtein(name, &candidates[idx])))
            .min_by_key(|&(_, _, d)| d);
        let Some((slot, idx, d)) = best else {
            break;
        };
        remaining.remove(slot);

        let shorter = name.chars().count().min(candidates[idx].chars().count());
        total += d as f64 / shorter as f64;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use synclattes_core::{Confidence, MetadataValue};

    fn authors(names: &[&str]) -> Vec<Author> {
        names.iter().map(|name| Author::new(*name)).collect()
    }

    #[test]
    fn reordered_names_match() {
        let a = vec![Author::new("J. Silva")];
        let b = vec![Author::new("Silva, J.")];
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.0);
        assert_eq!(author_set_distance(&b, &a).unwrap(), 0.0);
    }

    #[test]
    fn shared_authority_ids_match_regardless_of_name() {
        let a = vec![Author::new("Maria Souza").with_authority_id("K4001")];
        let b = vec![Author::new("M. S. Oliveira").with_authority_id("K4001")];
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn citation_names_rescue_divergent_full_names() {
        let a = vec![Author::new("Maria Aparecida Souza").with_citation_name("SOUZA, M. A.")];
        let b = vec![Author::new("M. Souza").with_citation_name("SOUZA, M. A.")];
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn accents_and_case_are_ignored() {
        let a = authors(&["José Antônio"]);
        let b = authors(&["JOSE ANTONIO"]);
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn unrelated_authors_are_far_apart() {
        let a = authors(&["Ana Lima", "Bruno Costa"]);
        let b = authors(&["Zélia Duncan", "Xavier Quintana"]);
        assert!(author_set_distance(&a, &b).unwrap() > 0.9);
    }

    #[test]
    fn normalizes_by_the_smaller_list() {
        // "abcd" pairs with "abce" (1/4), the extra author of `b` is ignored.
        let a = authors(&["abcd"]);
        let b = authors(&["abce", "zzzz"]);
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.25);
        assert_eq!(author_set_distance(&b, &a).unwrap(), 0.25);
    }

    #[test]
    fn equal_length_lists_can_be_asymmetric() {
        let a = authors(&["abcd", "abce"]);
        let b = authors(&["abce", "zzzz"]);
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.625);
        assert_eq!(author_set_distance(&b, &a).unwrap(), 0.5);
    }

    #[test]
    fn empty_list_is_a_precondition_error() {
        let a = authors(&["Ana Lima"]);
        assert!(matches!(
            author_set_distance(&a, &[]),
            Err(DedupError::Precondition(_))
        ));
        assert!(matches!(
            author_set_distance(&[], &a),
            Err(DedupError::Precondition(_))
        ));
    }

    #[test]
    fn nameless_authors_do_not_count() {
        let a = authors(&["Ana Lima", "---"]);
        let b = authors(&["Lima, Ana", "Paulo Reis"]);
        assert_eq!(author_set_distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn caller_lists_are_untouched() {
        let a = authors(&["Ana Lima", "Bruno Costa"]);
        let b = authors(&["Bruno Costa", "Ana Lima", "Carla Dias"]);
        let before = (a.clone(), b.clone());
        author_set_distance(&a, &b).unwrap();
        assert_eq!((a, b), before);
    }

    #[test]
    fn from_metadata_pairs_citations_by_position() {
        let meta = Metadata::new()
            .with_record(
                keys::AUTHOR,
                MetadataValue::new("Ana Lima").with_authority("K1", Confidence::ACCEPTED),
            )
            .with_value(keys::AUTHOR, "Bruno Costa")
            .with_value(keys::AUTHOR_CITATION, "LIMA, A.");

        let parsed = Author::from_metadata(&meta);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].citation_name, "LIMA, A.");
        assert_eq!(parsed[0].authority_id.as_deref(), Some("K1"));
        assert_eq!(parsed[1].citation_name, "Bruno Costa");
        assert_eq!(parsed[1].authority_id, None);
    }

    proptest! {
        #[test]
        fn symmetric_for_different_lengths(
            a in prop::collection::vec("[a-z]{1,8}", 1..5),
            b in prop::collection::vec("[a-z]{1,8}", 1..5),
        ) {
            prop_assume!(a.len() != b.len());
            let a: Vec<Author> = a.into_iter().map(Author::new).collect();
            let b: Vec<Author> = b.into_iter().map(Author::new).collect();
            prop_assert_eq!(
                author_set_distance(&a, &b).unwrap(),
                author_set_distance(&b, &a).unwrap()
            );
        }

        #[test]
        fn identical_lists_score_zero(names in prop::collection::vec("[a-z]{1,8}", 1..5)) {
            let a: Vec<Author> = names.into_iter().map(Author::new).collect();
            prop_assert_eq!(author_set_distance(&a, &a).unwrap(), 0.0);
        }
    }
}
