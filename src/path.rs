//! Dot-separated relation paths.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An ordered chain of relation traversals from a root entity, e.g. `variants.taxCategory`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationPath {
    segments: Vec<String>,
}

impl RelationPath {
    /// Split on `.`, dropping empty segments.
    pub fn parse(s: &str) -> Self {
        RelationPath {
            segments: s
                .split('.')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RelationPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(RelationPath::parse(segment).segments);
        RelationPath { segments }
    }

    pub fn join(&self, other: &RelationPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        RelationPath { segments }
    }

    /// Relation property keys along the path: a `customFields.<name>` pair is one property.
    /// A trailing bare `customFields` stays a property of its own.
    pub fn properties(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.segments.len());
        let mut iter = self.segments.iter();
        while let Some(segment) = iter.next() {
            if segment == crate::config::CUSTOM_FIELDS {
                if let Some(name) = iter.next() {
                    out.push(format!("{}.{}", segment, name));
                    continue;
                }
            }
            out.push(segment.clone());
        }
        out
    }

    /// Every non-empty prefix, shortest first, including the path itself. Prefixes end on
    /// property boundaries, so `customFields.hero` has no bare `customFields` prefix.
    pub fn prefixes(&self) -> Vec<RelationPath> {
        let mut out = Vec::new();
        let mut current = RelationPath::default();
        for property in self.properties() {
            current = current.child(&property);
            out.push(current.clone());
        }
        out
    }

    /// True if `prefix` equals this path or is a leading run of its segments.
    pub fn starts_with(&self, prefix: &RelationPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for RelationPath {
    fn from(s: &str) -> Self {
        RelationPath::parse(s)
    }
}

impl From<String> for RelationPath {
    fn from(s: String) -> Self {
        RelationPath::parse(&s)
    }
}

impl Serialize for RelationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RelationPath::parse(&s))
    }
}

/// Parse a list of dotted strings.
pub fn paths<I, S>(items: I) -> Vec<RelationPath>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| RelationPath::parse(s.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_shortest_first() {
        let p = RelationPath::parse("variants.taxCategory.zone");
        let prefixes: Vec<String> = p.prefixes().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            prefixes,
            vec!["variants", "variants.taxCategory", "variants.taxCategory.zone"]
        );
    }

    #[test]
    fn custom_field_pairs_are_one_property() {
        let p = RelationPath::parse("customFields.hero.featuredAsset");
        assert_eq!(p.properties(), vec!["customFields.hero", "featuredAsset"]);
        let prefixes: Vec<String> = p.prefixes().iter().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["customFields.hero", "customFields.hero.featuredAsset"]);
        assert_eq!(RelationPath::parse("variants.customFields").properties(), vec!["variants", "customFields"]);
    }

    #[test]
    fn starts_with_respects_segment_boundaries() {
        let p = RelationPath::parse("variants.taxCategory");
        assert!(p.starts_with(&RelationPath::parse("variants")));
        assert!(p.starts_with(&p));
        assert!(!p.starts_with(&RelationPath::parse("variant")));
        assert!(!RelationPath::parse("variantsX").starts_with(&RelationPath::parse("variants")));
    }

    #[test]
    fn serializes_as_dotted_string() {
        let p = RelationPath::parse("parent.parent");
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"parent.parent\"");
        let back: RelationPath = serde_json::from_str("\"parent..parent\"").unwrap();
        assert_eq!(back, p);
    }
}
