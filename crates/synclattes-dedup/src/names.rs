//! Personal-name keys: initials, name reordering and edit distance.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DedupError, Result};
use crate::normalize::{normalize, NormLevel};

/// Nobiliary particles dropped before taking initials.
pub const NOBILIARY_PARTICLES: [&str; 9] = ["de", "dit", "la", "von", "af", "der", "und", "zu", "of"];

static PARTICLE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives = NOBILIARY_PARTICLES.join("|");
    Regex::new(&format!(r"\b(?:{alternatives})\b")).unwrap()
});

static TOKEN_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s.]+").unwrap());

/// Turns "surname, given names" into "given names surname".
///
/// Only the first two comma-separated segments are kept.
pub fn reorder_name(name: &str) -> String {
    let mut segments = name.split(',');
    match (segments.next(), segments.next()) {
        (Some(surname), Some(given)) => format!("{} {}", given.trim(), surname.trim()),
        _ => name.to_string(),
    }
}

/// Lowercase ASCII initials of a personal name, particles excluded.
///
/// Returns an empty string when the name has no usable letters.
pub fn initials(name: &str) -> String {
    let normalized = normalize(name, NormLevel::None);
    let without_particles = PARTICLE_RE.replace_all(&normalized, " ");
    let ordered = if without_particles.contains(',') {
        reorder_name(&without_particles)
    } else {
        without_particles.into_owned()
    };

    TOKEN_SPLIT_RE
        .split(&ordered)
        .filter_map(|token| token.chars().next())
        .filter(char::is_ascii_lowercase)
        .collect()
}

/// Edit distance between the initials of two names.
pub fn distance(a: &str, b: &str) -> Result<usize> {
    let ia = initials(a);
    let ib = initials(b);
    if ia.is_empty() || ib.is_empty() {
        return Err(DedupError::InvalidInput(format!(
            "cannot compare names without initials: {a:?} vs {b:?}"
        )));
    }
    Ok(levenshtein(&ia, &ib))
}

/// Levenshtein distance with unit costs, in O(min(n, m)) working space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut previous: Vec<usize> = (0..=short.len()).collect();
    let mut current = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        current[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = previous[j] + usize::from(lc != sc);
            let insertion = previous[j + 1] + 1;
            let deletion = current[j] + 1;
            current[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[short.len()]
}
