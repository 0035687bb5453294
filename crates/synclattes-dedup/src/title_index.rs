//! Approximate title lookup over character n-grams.

use std::collections::{BTreeSet, HashMap};

use synclattes_core::RevisionId;

/// Similarity search over normalized titles.
pub trait TitleIndex {
    /// Ids whose title has similarity of at least `threshold` with `title`.
    fn find_similar(&self, title: &str, threshold: f64) -> BTreeSet<RevisionId>;
}

/// A gram and its occurrence number within the string, so repeated grams count
/// separately.
type Gram = (String, u32);

/// Inverted index of character n-grams, scored with the Jaccard coefficient.
#[derive(Debug, Clone)]
pub struct NgramTitleIndex {
    n: usize,
    postings: HashMap<Gram, Vec<RevisionId>>,
    sizes: HashMap<RevisionId, usize>,
}

impl Default for NgramTitleIndex {
    fn default() -> Self {
        Self::new(5)
    }
}

impl NgramTitleIndex {
    /// `n` below 1 is treated as 1.
    pub fn new(n: usize) -> Self {
        Self {
            n: n.max(1),
            postings: HashMap::new(),
            sizes: HashMap::new(),
        }
    }

    /// Adds a title. Returns `false` when the id was already indexed or the title is
    /// empty.
    pub fn insert(&mut self, id: RevisionId, title: &str) -> bool {
        if self.sizes.contains_key(&id) {
            return false;
        }
        let grams = ngrams(title, self.n);
        if grams.is_empty() {
            return false;
        }

        self.sizes.insert(id, grams.len());
        for gram in grams {
            self.postings.entry(gram).or_default().push(id);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl TitleIndex for NgramTitleIndex {
    fn find_similar(&self, title: &str, threshold: f64) -> BTreeSet<RevisionId> {
        let grams = ngrams(title, self.n);
        if grams.is_empty() {
            return BTreeSet::new();
        }
        let query_size = grams.len() as f64;

        // |X ∩ Y| / |X ∪ Y| >= t only if t·|X| <= |Y| <= |X| / t.
        let min_size = threshold * query_size;
        let max_size = if threshold > 0.0 {
            query_size / threshold
        } else {
            f64::INFINITY
        };

        let mut overlaps: HashMap<RevisionId, usize> = HashMap::new();
        for gram in &grams {
            if let Some(ids) = self.postings.get(gram) {
                for id in ids {
                    *overlaps.entry(*id).or_default() += 1;
                }
            }
        }

        overlaps
            .into_iter()
            .filter_map(|(id, overlap)| {
                let size = *self.sizes.get(&id)? as f64;
                if size < min_size || size > max_size {
                    return None;
                }
                let overlap = overlap as f64;
                let jaccard = overlap / (query_size + size - overlap);
                (jaccard >= threshold).then_some(id)
            })
            .collect()
    }
}

/// Character n-grams without begin/end markers. Strings shorter than `n` form a single
/// gram.
fn ngrams(text: &str, n: usize) -> Vec<Gram> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let windows: Vec<String> = if chars.len() < n {
        vec![chars.iter().collect()]
    } else {
        chars.windows(n).map(|w| w.iter().collect()).collect()
    };

    let mut seen: HashMap<&str, u32> = HashMap::new();
    let mut grams = Vec::with_capacity(windows.len());
    for window in &windows {
        let occurrence = seen.entry(window.as_str()).or_default();
        *occurrence += 1;
        grams.push((window.clone(), *occurrence));
    }
    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(titles: &[(RevisionId, &str)]) -> NgramTitleIndex {
        let mut index = NgramTitleIndex::new(5);
        for (id, title) in titles {
            index.insert(*id, title);
        }
        index
    }

    #[test]
    fn ngrams_count_repeats_separately() {
        let grams = ngrams("aaaaaa", 5);
        assert_eq!(
            grams,
            vec![("aaaaa".to_string(), 1), ("aaaaa".to_string(), 2)]
        );
    }

    #[test]
    fn short_strings_are_one_gram() {
        assert_eq!(ngrams("abc", 5), vec![("abc".to_string(), 1)]);
        assert!(ngrams("", 5).is_empty());
    }

    #[test]
    fn finds_exact_and_near_titles() {
        let index = index(&[
            (1, "algoritmos geneticos aplicados a roteamento"),
            (2, "algoritmos geneticos aplicados ao roteamento"),
            (3, "uma historia da quimica no brasil"),
        ]);

        let hits = index.find_similar("algoritmos geneticos aplicados a roteamento", 0.7);
        assert_eq!(hits, BTreeSet::from([1, 2]));

        let hits = index.find_similar("uma historia da quimica no brasil", 0.7);
        assert_eq!(hits, BTreeSet::from([3]));
    }

    #[test]
    fn threshold_one_requires_identical_gram_multisets() {
        let index = index(&[(1, "redes neurais"), (2, "redes neurais profundas")]);
        assert_eq!(index.find_similar("redes neurais", 1.0), BTreeSet::from([1]));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let index = index(&[(1, "redes neurais")]);
        assert!(index.find_similar("", 0.1).is_empty());
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut index = NgramTitleIndex::new(3);
        assert!(index.insert(7, "grafos"));
        assert!(!index.insert(7, "outro titulo"));
        assert!(!index.insert(8, ""));
        assert_eq!(index.len(), 1);
        assert!(index.find_similar("outro titulo", 0.5).is_empty());
    }
}
