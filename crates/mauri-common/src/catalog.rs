//! Catalog records: pests, community submissions, and users.
//! These are the Rust representations of the `pests`, `submissions` and
//! `users` tables; the db crate maps rows into them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MauriError, Result};
use crate::facets::FacetSet;

// ---------------------------------------------------------------------------
// Pest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pest {
    pub id: i64,
    pub title: String,
    pub latin: Option<String>,
    pub also_known_as: Option<String>,
    pub keywords: Option<String>,
    pub pest_groups: FacetSet,
    pub pest_types: FacetSet,
    pub management_approaches: FacetSet,
    pub alert: bool,
    pub pinned: bool,
    pub visible: bool,
    pub featured_image: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pest {
    /// Keywords are stored comma-joined like the facets, but shown as tags.
    pub fn keyword_list(&self) -> FacetSet {
        FacetSet::parse_opt(self.keywords.as_deref())
    }

    /// The text fields the public search matches against.
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str())
            .chain(self.latin.as_deref())
            .chain(self.also_known_as.as_deref())
            .chain(self.keywords.as_deref())
    }
}

/// Fields accepted when creating a pest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPest {
    pub title: String,
    #[serde(default)]
    pub latin: Option<String>,
    #[serde(default)]
    pub also_known_as: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub pest_groups: FacetSet,
    #[serde(default)]
    pub pest_types: FacetSet,
    #[serde(default)]
    pub management_approaches: FacetSet,
    #[serde(default)]
    pub alert: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

fn default_visible() -> bool { true }

impl NewPest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            visible: true,
            ..Default::default()
        }
    }

    /// Trim the title and collapse blank optional text to `None`.
    pub fn normalized(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(MauriError::validation("title", "must not be blank"));
        }
        self.latin = blank_to_none(self.latin);
        self.also_known_as = blank_to_none(self.also_known_as);
        self.keywords = blank_to_none(self.keywords);
        self.featured_image = blank_to_none(self.featured_image);
        self.link = blank_to_none(self.link);
        Ok(self)
    }

    pub fn into_pest(self, id: i64, now: DateTime<Utc>) -> Pest {
        Pest {
            id,
            title: self.title,
            latin: self.latin,
            also_known_as: self.also_known_as,
            keywords: self.keywords,
            pest_groups: self.pest_groups,
            pest_types: self.pest_types,
            management_approaches: self.management_approaches,
            alert: self.alert,
            pinned: self.pinned,
            visible: self.visible,
            featured_image: self.featured_image,
            link: self.link,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update: only `Some` fields are written. For optional text
/// fields an empty string clears the column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PestPatch {
    pub title: Option<String>,
    pub latin: Option<String>,
    pub also_known_as: Option<String>,
    pub keywords: Option<String>,
    pub pest_groups: Option<FacetSet>,
    pub pest_types: Option<FacetSet>,
    pub management_approaches: Option<FacetSet>,
    pub alert: Option<bool>,
    pub pinned: Option<bool>,
    pub visible: Option<bool>,
    pub featured_image: Option<String>,
    pub link: Option<String>,
}

impl PestPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.latin.is_none()
            && self.also_known_as.is_none()
            && self.keywords.is_none()
            && self.pest_groups.is_none()
            && self.pest_types.is_none()
            && self.management_approaches.is_none()
            && self.alert.is_none()
            && self.pinned.is_none()
            && self.visible.is_none()
            && self.featured_image.is_none()
            && self.link.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(MauriError::validation("title", "must not be blank"));
            }
        }
        Ok(())
    }

    /// Apply to an in-memory record. Used by the memory store; the
    /// Postgres store builds the equivalent UPDATE.
    pub fn apply(&self, pest: &mut Pest, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            pest.title = title.trim().to_string();
        }
        if let Some(v) = &self.latin { pest.latin = blank_to_none(Some(v.clone())); }
        if let Some(v) = &self.also_known_as { pest.also_known_as = blank_to_none(Some(v.clone())); }
        if let Some(v) = &self.keywords { pest.keywords = blank_to_none(Some(v.clone())); }
        if let Some(v) = &self.pest_groups { pest.pest_groups = v.clone(); }
        if let Some(v) = &self.pest_types { pest.pest_types = v.clone(); }
        if let Some(v) = &self.management_approaches { pest.management_approaches = v.clone(); }
        if let Some(v) = self.alert { pest.alert = v; }
        if let Some(v) = self.pinned { pest.pinned = v; }
        if let Some(v) = self.visible { pest.visible = v; }
        if let Some(v) = &self.featured_image { pest.featured_image = blank_to_none(Some(v.clone())); }
        if let Some(v) = &self.link { pest.link = blank_to_none(Some(v.clone())); }
        pest.updated_at = now;
    }
}

pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Impact severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::None,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Severe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Severe => "severe",
        }
    }

    /// Option label used by the observation form.
    pub fn describe(&self) -> &'static str {
        match self {
            Severity::None => "No observed impact",
            Severity::Low => "Low impact",
            Severity::Medium => "Medium impact",
            Severity::High => "High impact",
            Severity::Severe => "Severe impact",
        }
    }

    /// Admin listing label; an unrated axis reads "Not assessed".
    pub fn label(severity: Option<Severity>) -> &'static str {
        match severity {
            Some(Severity::None) => "None",
            Some(Severity::Low) => "Low",
            Some(Severity::Medium) => "Medium",
            Some(Severity::High) => "High",
            Some(Severity::Severe) => "Severe",
            None => "Not assessed",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = MauriError;

    fn from_str(s: &str) -> Result<Self> {
        Severity::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MauriError::UnknownVariant { kind: "severity", value: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub pest_id: i64,
    pub pest_title: String,
    pub location: String,
    pub observation_date: NaiveDate,
    pub notes: Option<String>,
    pub impact_whenua: Option<Severity>,
    pub impact_wai: Option<Severity>,
    pub impact_tangata: Option<Severity>,
    pub photo_urls: Vec<String>,
    pub photo_keys: Vec<String>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated submission ready to be written. Photos are already
/// uploaded; only their URLs and keys travel here.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub pest_id: i64,
    pub pest_title: String,
    pub location: String,
    pub observation_date: NaiveDate,
    pub notes: Option<String>,
    pub impact_whenua: Option<Severity>,
    pub impact_wai: Option<Severity>,
    pub impact_tangata: Option<Severity>,
    pub photo_urls: Vec<String>,
    pub photo_keys: Vec<String>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewSubmission {
    pub fn into_submission(self, id: i64, now: DateTime<Utc>) -> Submission {
        Submission {
            id,
            pest_id: self.pest_id,
            pest_title: self.pest_title,
            location: self.location,
            observation_date: self.observation_date,
            notes: self.notes,
            impact_whenua: self.impact_whenua,
            impact_wai: self.impact_wai,
            impact_tangata: self.impact_tangata,
            photo_urls: self.photo_urls,
            photo_keys: self.photo_keys,
            submitter_name: self.submitter_name,
            submitter_email: self.submitter_email,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MauriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(MauriError::UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Sign-in upsert. `None` fields are left untouched on an existing row.
#[derive(Debug, Clone, Default)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<Role>,
    pub last_signed_in: Option<DateTime<Utc>>,
}

impl UpsertUser {
    pub fn new(open_id: impl Into<String>) -> Self {
        Self { open_id: open_id.into(), ..Default::default() }
    }

    /// Fill in the derived fields: the owner account is promoted to admin
    /// when no explicit role is given, and the sign-in time defaults to now.
    pub fn resolve(mut self, owner_open_id: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        if self.open_id.trim().is_empty() {
            return Err(MauriError::validation("open_id", "is required for upsert"));
        }
        if self.role.is_none() && owner_open_id == Some(self.open_id.as_str()) {
            self.role = Some(Role::Admin);
        }
        if self.last_signed_in.is_none() {
            self.last_signed_in = Some(now);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_and_order() {
        assert_eq!("Severe".parse::<Severity>().unwrap(), Severity::Severe);
        assert!("extreme".parse::<Severity>().is_err());
        assert!(Severity::Low < Severity::High);
        assert_eq!(Severity::label(None), "Not assessed");
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), r#""medium""#);
    }

    #[test]
    fn test_new_pest_normalization() {
        let mut input = NewPest::new("  Gorse ");
        input.latin = Some("   ".into());
        let pest = input.normalized().unwrap();
        assert_eq!(pest.title, "Gorse");
        assert_eq!(pest.latin, None);
        assert!(pest.visible);

        assert!(NewPest::new(" ").normalized().is_err());
    }

    #[test]
    fn test_new_pest_json_defaults_visible() {
        let pest: NewPest = serde_json::from_str(r#"{"title":"Broom","pest_groups":"Plants, Shrubs"}"#).unwrap();
        assert!(pest.visible);
        assert!(!pest.alert);
        assert_eq!(pest.pest_groups.len(), 2);
    }

    #[test]
    fn test_patch_apply_only_touches_supplied_fields() {
        let now = Utc::now();
        let mut pest = NewPest::new("Gorse").into_pest(1, now);
        pest.latin = Some("Ulex europaeus".into());

        let patch = PestPatch { alert: Some(true), link: Some(String::new()), ..Default::default() };
        patch.apply(&mut pest, now);

        assert!(pest.alert);
        assert_eq!(pest.latin.as_deref(), Some("Ulex europaeus"));
        assert_eq!(pest.link, None);
        assert!(!patch.is_empty());
        assert!(PestPatch::default().is_empty());
    }

    #[test]
    fn test_upsert_promotes_owner() {
        let now = Utc::now();
        let owner = UpsertUser::new("owner-1").resolve(Some("owner-1"), now).unwrap();
        assert_eq!(owner.role, Some(Role::Admin));
        assert_eq!(owner.last_signed_in, Some(now));

        let other = UpsertUser::new("someone").resolve(Some("owner-1"), now).unwrap();
        assert_eq!(other.role, None);

        assert!(UpsertUser::new("").resolve(None, now).is_err());
    }
}
