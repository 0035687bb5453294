use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keys (schema or element) starting with this marker are internal and never published.
pub const PRIVATE_MARKER: char = '_';

/// Authority confidence, on the repository's 600..-1 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(pub i32);

impl Confidence {
    pub const ACCEPTED: Confidence = Confidence(600);
    pub const UNCERTAIN: Confidence = Confidence(500);
    pub const AMBIGUOUS: Confidence = Confidence(400);
    pub const NOT_FOUND: Confidence = Confidence(300);
    pub const FAILED: Confidence = Confidence(200);
    pub const REJECTED: Confidence = Confidence(100);
    pub const NO_VALUE: Confidence = Confidence(0);
    pub const UNSET: Confidence = Confidence(-1);
}

/// One value record stored under a metadata key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl MetadataValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: None,
            authority: None,
            confidence: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>, confidence: Confidence) -> Self {
        self.authority = Some(authority.into());
        self.confidence = Some(confidence);
        self
    }

    /// Authority id, if one is set and non-blank.
    pub fn authority_id(&self) -> Option<&str> {
        self.authority
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Address of a metadata field: `schema.element[.qualifier]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataKey<'a> {
    pub schema: &'a str,
    pub element: &'a str,
    pub qualifier: Option<&'a str>,
}

impl<'a> MetadataKey<'a> {
    pub const fn new(schema: &'a str, element: &'a str, qualifier: Option<&'a str>) -> Self {
        Self {
            schema,
            element,
            qualifier,
        }
    }

    pub fn is_private(&self) -> bool {
        self.schema.starts_with(PRIVATE_MARKER) || self.element.starts_with(PRIVATE_MARKER)
    }
}

impl std::fmt::Display for MetadataKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.qualifier {
            Some(q) if !q.is_empty() => write!(f, "{}.{}.{}", self.schema, self.element, q),
            _ => write!(f, "{}.{}", self.schema, self.element),
        }
    }
}

pub mod keys {
    use super::MetadataKey;

    pub const TITLE: MetadataKey<'static> = MetadataKey::new("dc", "title", None);
    pub const AUTHOR: MetadataKey<'static> = MetadataKey::new("dc", "contributor", Some("author"));
    pub const AUTHOR_CITATION: MetadataKey<'static> =
        MetadataKey::new("_lattes", "contributor", Some("citation"));
    pub const DATE_ISSUED: MetadataKey<'static> = MetadataKey::new("dc", "date", Some("issued"));
    pub const TYPE: MetadataKey<'static> = MetadataKey::new("dc", "type", None);
    pub const DOI: MetadataKey<'static> = MetadataKey::new("dc", "identifier", Some("doi"));
    pub const RELEVANCE: MetadataKey<'static> =
        MetadataKey::new("_lattes", "flag", Some("relevance"));
}

/// A flat metadata entry, the shape handed to a repository publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datum {
    pub mdschema: String,
    pub element: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,

    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

type Qualifiers = BTreeMap<String, Vec<MetadataValue>>;
type Elements = BTreeMap<String, Qualifiers>;

/// Structured metadata of a harvested production: schema → element → qualifier → values.
///
/// An absent qualifier is stored under the empty-string key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    schemas: BTreeMap<String, Elements>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, key: MetadataKey<'_>) -> &[MetadataValue] {
        self.schemas
            .get(key.schema)
            .and_then(|elements| elements.get(key.element))
            .and_then(|qualifiers| qualifiers.get(key.qualifier.unwrap_or("")))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first_value(&self, key: MetadataKey<'_>) -> Option<&str> {
        self.values(key)
            .iter()
            .map(|v| v.value.trim())
            .find(|v| !v.is_empty())
    }

    pub fn push(&mut self, key: MetadataKey<'_>, value: MetadataValue) {
        self.schemas
            .entry(key.schema.to_string())
            .or_default()
            .entry(key.element.to_string())
            .or_default()
            .entry(key.qualifier.unwrap_or("").to_string())
            .or_default()
            .push(value);
    }

    pub fn with_value(mut self, key: MetadataKey<'_>, value: impl Into<String>) -> Self {
        self.push(key, MetadataValue::new(value));
        self
    }

    pub fn with_record(mut self, key: MetadataKey<'_>, value: MetadataValue) -> Self {
        self.push(key, value);
        self
    }

    /// Every key holding at least one value.
    pub fn keys(&self) -> impl Iterator<Item = MetadataKey<'_>> {
        self.schemas.iter().flat_map(|(schema, elements)| {
            elements.iter().flat_map(move |(element, qualifiers)| {
                qualifiers
                    .iter()
                    .filter(|(_, values)| !values.is_empty())
                    .map(move |(qualifier, _)| {
                        MetadataKey::new(
                            schema,
                            element,
                            (!qualifier.is_empty()).then_some(qualifier.as_str()),
                        )
                    })
            })
        })
    }

    pub fn key_count(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }

    /// Copy without private schemas and elements.
    pub fn publishable(&self) -> Metadata {
        let schemas = self
            .schemas
            .iter()
            .filter(|(schema, _)| !schema.starts_with(PRIVATE_MARKER))
            .map(|(schema, elements)| {
                let elements = elements
                    .iter()
                    .filter(|(element, _)| !element.starts_with(PRIVATE_MARKER))
                    .map(|(element, qualifiers)| (element.clone(), qualifiers.clone()))
                    .collect();
                (schema.clone(), elements)
            })
            .collect();
        Metadata { schemas }
    }

    /// Flattens the publishable part into datums, in key order.
    pub fn to_datums(&self) -> Vec<Datum> {
        let mut datums = Vec::new();
        for key in self.keys().filter(|key| !key.is_private()) {
            for value in self.values(key) {
                datums.push(Datum {
                    mdschema: key.schema.to_string(),
                    element: key.element.to_string(),
                    qualifier: key.qualifier.map(str::to_string),
                    value: value.value.clone(),
                    lang: value.lang.clone(),
                    authority: value.authority.clone(),
                    confidence: value.confidence,
                });
            }
        }
        datums
    }

    // ─── Well-known fields ─────────────────────────────────

    pub fn title(&self) -> Option<&str> {
        self.first_value(keys::TITLE)
    }

    /// Publication year, taken from the leading digits of `dc.date.issued`.
    pub fn year(&self) -> Option<i32> {
        let issued = self.first_value(keys::DATE_ISSUED)?;
        let digits = issued.get(..4)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.first_value(keys::TYPE)
    }

    pub fn doi(&self) -> Option<&str> {
        self.first_value(keys::DOI)
    }

    pub fn is_relevant(&self) -> bool {
        self.first_value(keys::RELEVANCE).is_some_and(|flag| {
            matches!(
                flag.to_ascii_lowercase().as_str(),
                "sim" | "yes" | "true" | "1"
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata::new()
            .with_value(keys::TITLE, "Sobre grafos")
            .with_value(keys::DATE_ISSUED, "2014-05")
            .with_record(
                keys::AUTHOR,
                MetadataValue::new("Silva, João").with_authority("lattes::123", Confidence::ACCEPTED),
            )
            .with_value(keys::AUTHOR_CITATION, "SILVA, J.")
            .with_value(keys::RELEVANCE, "SIM")
    }

    #[test]
    fn missing_qualifier_is_stored_under_empty_key() {
        let meta = sample();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["dc"]["title"][""][0]["value"], "Sobre grafos");
        assert!(json["dc"]["title"].get("null").is_none());
    }

    #[test]
    fn json_roundtrip_keeps_tree() {
        let meta = sample();
        let json = serde_json::to_string(&meta).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.values(keys::AUTHOR)[0].authority_id(), Some("lattes::123"));
    }

    #[test]
    fn well_known_accessors() {
        let meta = sample();
        assert_eq!(meta.title(), Some("Sobre grafos"));
        assert_eq!(meta.year(), Some(2014));
        assert!(meta.doi().is_none());
        assert!(meta.is_relevant());
        assert_eq!(meta.key_count(), 5);
    }

    #[test]
    fn year_requires_four_leading_digits() {
        let meta = Metadata::new().with_value(keys::DATE_ISSUED, "s.d.");
        assert_eq!(meta.year(), None);
    }

    #[test]
    fn private_keys_are_not_published() {
        let meta = sample();
        let public = meta.publishable();
        assert!(public.values(keys::AUTHOR_CITATION).is_empty());
        assert!(!public.is_relevant());
        assert_eq!(public.key_count(), 3);

        let datums = meta.to_datums();
        assert_eq!(datums.len(), 3);
        assert!(datums.iter().all(|d| !d.mdschema.starts_with('_')));
        let title = datums.iter().find(|d| d.element == "title").unwrap();
        assert_eq!(title.qualifier, None);
    }

    #[test]
    fn private_element_inside_public_schema_is_hidden() {
        let hidden = MetadataKey::new("dc", "_internal", None);
        let meta = Metadata::new()
            .with_value(keys::TITLE, "T")
            .with_value(hidden, "x");
        assert_eq!(meta.publishable().key_count(), 1);
        assert_eq!(meta.to_datums().len(), 1);
    }
}
