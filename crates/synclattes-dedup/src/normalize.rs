//! Text canonicalization shared by every comparator.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{DedupError, Result};

/// How much is stripped beyond accents, case and surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormLevel {
    #[default]
    None,
    /// Drop punctuation and symbols, keep letters, digits and spaces.
    StripPunctuation,
    /// Keep only letters and single spaces.
    LettersAndSpaces,
    /// Keep only letters.
    LettersOnly,
}

/// Encoding of raw harvested bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// ISO-8859-1, the legacy CV export encoding.
    Latin1,
}

pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| DedupError::InvalidInput(format!("not valid UTF-8: {e}"))),
        // Latin-1 code points coincide with the first 256 Unicode scalars.
        Encoding::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
    }
}

/// Accent-free, lowercase, whitespace-collapsed form of `text`.
pub fn normalize(text: &str, level: NormLevel) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| match level {
            NormLevel::None => true,
            NormLevel::StripPunctuation => c.is_alphanumeric() || c.is_whitespace(),
            NormLevel::LettersAndSpaces => c.is_alphabetic() || c.is_whitespace(),
            NormLevel::LettersOnly => c.is_alphabetic(),
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_bytes(bytes: &[u8], encoding: Encoding, level: NormLevel) -> Result<String> {
    decode(bytes, encoding).map(|text| normalize(&text, level))
}
