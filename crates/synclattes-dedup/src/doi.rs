use serde::{Deserialize, Serialize};

use crate::error::{DedupError, Result};

/// Resolver prefixes accepted in front of a DOI, longest first.
const RESOLVERS: [&str; 6] = [
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "https://doi.acm.org/",
    "http://doi.acm.org/",
    "https://doi.org/",
    "http://doi.org/",
];

/// Resolver used for [`Doi::url`].
const CANONICAL_RESOLVER: &str = "http://dx.doi.org/";

/// A DOI as declared in `dc.identifier.doi`, in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = || DedupError::InvalidInput(format!("not a DOI: {input:?}"));

        let lowered = input.to_ascii_lowercase();
        let stripped = if let Some(rest) = lowered.strip_prefix("doi:") {
            rest.trim_start()
        } else if let Some(resolver) = RESOLVERS.iter().find(|r| lowered.starts_with(*r)) {
            &lowered[resolver.len()..]
        } else {
            lowered.as_str()
        };

        if !stripped.starts_with("10.") {
            return Err(invalid());
        }
        let slash = stripped.find('/').ok_or_else(invalid)?;
        if stripped[slash + 1..].trim().is_empty() {
            return Err(invalid());
        }

        let normalized = stripped.to_string();
        let url = format!("{CANONICAL_RESOLVER}{normalized}");
        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_doi() {
        let doi = Doi::parse("10.1590/S0100-40422009000100001").unwrap();
        assert_eq!(doi.normalized, "10.1590/s0100-40422009000100001");
        assert_eq!(doi.url, "http://dx.doi.org/10.1590/s0100-40422009000100001");
    }

    #[test]
    fn scheme_prefix() {
        assert_eq!(Doi::parse("doi:10.1000/xyz").unwrap().normalized, "10.1000/xyz");
        assert_eq!(Doi::parse("DOI: 10.1000/xyz").unwrap().normalized, "10.1000/xyz");
    }

    #[test]
    fn resolver_urls() {
        for input in [
            "http://dx.doi.org/10.1000/xyz",
            "https://doi.org/10.1000/xyz",
            "http://doi.acm.org/10.1000/xyz",
        ] {
            let doi = Doi::parse(input).unwrap();
            assert_eq!(doi.normalized, "10.1000/xyz");
            assert_eq!(doi.url, "http://dx.doi.org/10.1000/xyz");
        }
    }

    #[test]
    fn rejects_non_dois() {
        for input in ["", "not-a-doi", "10.1000", "10.1000/", "http://example.org/10.1000/x"] {
            assert!(
                matches!(Doi::parse(input), Err(DedupError::InvalidInput(_))),
                "{input:?} should be rejected"
            );
        }
    }
}
