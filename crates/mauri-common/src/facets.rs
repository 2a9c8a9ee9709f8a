//! Facet values (pest groups, pest types, management approaches).
//!
//! Storage keeps each facet as one comma-joined string per pest. Everything
//! above the storage layer works with `FacetSet`, so splitting and trimming
//! happens exactly once, in `FacetSet::parse`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// Ordered, duplicate-free list of facet values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSet(Vec<String>);

impl FacetSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse a comma-separated facet string. Values are trimmed, empties
    /// dropped, and the first occurrence of a repeated value wins.
    pub fn parse(raw: &str) -> Self {
        let mut set = Self::new();
        for value in raw.split(',') {
            set.insert(value);
        }
        set
    }

    /// `None` and the empty string both parse to an empty set.
    pub fn parse_opt(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for value in values {
            // Values coming from forms may themselves be comma-joined.
            for part in value.as_ref().split(',') {
                set.insert(part);
            }
        }
        set
    }

    /// Insert a value, returning false if it was blank or already present.
    pub fn insert(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.0.push(value.to_string());
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// True if any value of `self` is among `selected`.
    pub fn intersects(&self, selected: &FacetSet) -> bool {
        self.0.iter().any(|v| selected.contains(v))
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form for the storage column; an empty set stores as NULL.
    pub fn to_storage(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join(","))
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a FacetSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for FacetSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FacetRepr {
    List(Vec<String>),
    Joined(String),
}

impl<'de> Deserialize<'de> for FacetSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match FacetRepr::deserialize(deserializer)? {
            FacetRepr::List(values) => FacetSet::from_values(values),
            FacetRepr::Joined(raw) => FacetSet::parse(&raw),
        })
    }
}

/// Sorted union of one facet across a set of records, for filter menus.
pub fn vocabulary<'a, T, F>(records: &'a [T], pick: F) -> Vec<String>
where
    F: Fn(&'a T) -> &'a FacetSet,
{
    let mut all = BTreeSet::new();
    for record in records {
        for value in pick(record).iter() {
            all.insert(value.to_string());
        }
    }
    all.into_iter().collect()
}
