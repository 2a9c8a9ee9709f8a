//! Table definitions and row mapping.
//!
//! Facets and photo lists are stored comma-joined in TEXT columns and
//! severities / roles as lowercase TEXT; rows are converted into the
//! `mauri_common` records here so nothing above this module sees the
//! storage encoding.

use chrono::{DateTime, NaiveDate, Utc};
use mauri_common::{FacetSet, Pest, Role, Severity, Submission, User};
use sqlx::FromRow;

use crate::error::{DbError, Result};

/// Idempotent bootstrap. Safe to run on every start.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    open_id         VARCHAR(64)  NOT NULL UNIQUE,
    name            TEXT,
    email           VARCHAR(320),
    login_method    VARCHAR(64),
    role            VARCHAR(16)  NOT NULL DEFAULT 'user',
    created_at      TIMESTAMPTZ  NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ  NOT NULL DEFAULT now(),
    last_signed_in  TIMESTAMPTZ  NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS pests (
    id                     BIGSERIAL PRIMARY KEY,
    title                  VARCHAR(255) NOT NULL UNIQUE,
    latin                  VARCHAR(255),
    also_known_as          TEXT,
    keywords               TEXT,
    pest_groups            TEXT,
    pest_types             TEXT,
    management_approaches  TEXT,
    alert                  BOOLEAN      NOT NULL DEFAULT FALSE,
    pinned                 BOOLEAN      NOT NULL DEFAULT FALSE,
    visible                BOOLEAN      NOT NULL DEFAULT TRUE,
    featured_image         TEXT,
    link                   TEXT,
    created_at             TIMESTAMPTZ  NOT NULL DEFAULT now(),
    updated_at             TIMESTAMPTZ  NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS pests_visible_title_idx ON pests (visible, title);

CREATE TABLE IF NOT EXISTS submissions (
    id                BIGSERIAL PRIMARY KEY,
    pest_id           BIGINT       NOT NULL,
    pest_title        VARCHAR(255) NOT NULL,
    location          TEXT         NOT NULL,
    observation_date  DATE         NOT NULL,
    notes             TEXT,
    impact_whenua     VARCHAR(16),
    impact_wai        VARCHAR(16),
    impact_tangata    VARCHAR(16),
    photo_urls        TEXT,
    photo_keys        TEXT,
    submitter_name    TEXT,
    submitter_email   VARCHAR(320),
    ip_address        VARCHAR(64),
    user_agent        TEXT,
    created_at        TIMESTAMPTZ  NOT NULL DEFAULT now(),
    updated_at        TIMESTAMPTZ  NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS submissions_created_idx ON submissions (created_at DESC);
"#;

pub(crate) const PEST_COLUMNS: &str = "id, title, latin, also_known_as, keywords, pest_groups, \
     pest_types, management_approaches, alert, pinned, visible, featured_image, link, \
     created_at, updated_at";

pub(crate) const SUBMISSION_COLUMNS: &str = "id, pest_id, pest_title, location, observation_date, \
     notes, impact_whenua, impact_wai, impact_tangata, photo_urls, photo_keys, submitter_name, \
     submitter_email, ip_address, user_agent, created_at, updated_at";

pub(crate) const USER_COLUMNS: &str =
    "id, open_id, name, email, login_method, role, created_at, updated_at, last_signed_in";

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, FromRow)]
pub(crate) struct PestRow {
    pub id: i64,
    pub title: String,
    pub latin: Option<String>,
    pub also_known_as: Option<String>,
    pub keywords: Option<String>,
    pub pest_groups: Option<String>,
    pub pest_types: Option<String>,
    pub management_approaches: Option<String>,
    pub alert: bool,
    pub pinned: bool,
    pub visible: bool,
    pub featured_image: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PestRow> for Pest {
    fn from(row: PestRow) -> Self {
        Pest {
            id: row.id,
            title: row.title,
            latin: row.latin,
            also_known_as: row.also_known_as,
            keywords: row.keywords,
            pest_groups: FacetSet::parse_opt(row.pest_groups.as_deref()),
            pest_types: FacetSet::parse_opt(row.pest_types.as_deref()),
            management_approaches: FacetSet::parse_opt(row.management_approaches.as_deref()),
            alert: row.alert,
            pinned: row.pinned,
            visible: row.visible,
            featured_image: row.featured_image,
            link: row.link,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SubmissionRow {
    pub id: i64,
    pub pest_id: i64,
    pub pest_title: String,
    pub location: String,
    pub observation_date: NaiveDate,
    pub notes: Option<String>,
    pub impact_whenua: Option<String>,
    pub impact_wai: Option<String>,
    pub impact_tangata: Option<String>,
    pub photo_urls: Option<String>,
    pub photo_keys: Option<String>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = DbError;

    fn try_from(row: SubmissionRow) -> Result<Self> {
        Ok(Submission {
            id: row.id,
            pest_id: row.pest_id,
            pest_title: row.pest_title,
            location: row.location,
            observation_date: row.observation_date,
            notes: row.notes,
            impact_whenua: parse_severity(row.id, row.impact_whenua)?,
            impact_wai: parse_severity(row.id, row.impact_wai)?,
            impact_tangata: parse_severity(row.id, row.impact_tangata)?,
            photo_urls: split_list(row.photo_urls.as_deref()),
            photo_keys: split_list(row.photo_keys.as_deref()),
            submitter_name: row.submitter_name,
            submitter_email: row.submitter_email,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_severity(id: i64, raw: Option<String>) -> Result<Option<Severity>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| DbError::InvalidRow(format!("submission {id}: {e}"))),
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| DbError::InvalidRow(format!("user {}: {e}", row.id)))?;
        Ok(User {
            id: row.id,
            open_id: row.open_id,
            name: row.name,
            email: row.email,
            login_method: row.login_method,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_signed_in: row.last_signed_in,
        })
    }
}

// ---------------------------------------------------------------------------
// List columns
// ---------------------------------------------------------------------------

/// Comma-join a list for a TEXT column; an empty list stores as NULL.
pub(crate) fn join_list(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Escape LIKE metacharacters so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
