//! Public pest search and facet filtering.
//!
//! A pest matches when every active predicate holds:
//!   - text: case-insensitive substring of title, latin, also-known-as or keywords
//!   - groups / types: the pest's facet values intersect the selection
//!   - alert_only: the pest carries an active alert
//!
//! Selections within one facet widen the result (OR); separate facets
//! narrow it (AND).

use serde::{Deserialize, Serialize};

use crate::catalog::Pest;
use crate::facets::FacetSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PestQuery {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub groups: FacetSet,
    #[serde(default)]
    pub types: FacetSet,
    #[serde(default)]
    pub alert_only: bool,
}

impl PestQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn with_groups(mut self, groups: FacetSet) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_types(mut self, types: FacetSet) -> Self {
        self.types = types;
        self
    }

    pub fn alerts_only(mut self, alert_only: bool) -> Self {
        self.alert_only = alert_only;
        self
    }

    /// Whitespace-only text counts as no text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.has_text() || !self.groups.is_empty() || !self.types.is_empty() || self.alert_only
    }

    pub fn matches(&self, pest: &Pest) -> bool {
        self.matches_text(pest)
            && (self.groups.is_empty() || pest.pest_groups.intersects(&self.groups))
            && (self.types.is_empty() || pest.pest_types.intersects(&self.types))
            && (!self.alert_only || pest.alert)
    }

    fn matches_text(&self, pest: &Pest) -> bool {
        if !self.has_text() {
            return true;
        }
        contains_ignore_case(pest, &self.text)
    }

    /// Filter `pests`, preserving their order.
    pub fn apply(&self, pests: &[Pest]) -> Vec<Pest> {
        pests.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}

/// Case-insensitive substring test over the searchable text fields.
/// Shared with the in-memory store so both search paths agree.
pub fn contains_ignore_case(pest: &Pest, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    pest.searchable_fields()
        .any(|field| field.to_lowercase().contains(&needle))
}
