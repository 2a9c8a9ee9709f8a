//! Public observation intake: payload validation, photo decoding and
//! upload, client metadata capture, and the final insert.
//!
//! Photos arrive as data URLs (`data:<mime>;base64,<payload>`). Each one
//! is decoded and uploaded under `submissions/<millis>-<random>.<ext>`.
//! A photo that is malformed or fails to upload is logged and dropped;
//! the submission itself still goes through.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use mauri_common::catalog::blank_to_none;
use mauri_common::config::SubmissionConfig;
use mauri_common::{NewSubmission, Severity, Submission};
use mauri_db::Database;
use regex::Regex;
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use thiserror::Error;

use crate::error::ApiError;
use crate::storage::PhotoStore;

lazy_static! {
    static ref DATA_URL: Regex = Regex::new(r"(?s)^data:([^;,]+);base64,(.+)$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Body of `submissions.create`, also accepted form-encoded from the pest
/// page. camelCase aliases keep older clients working.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObservationPayload {
    #[serde(alias = "pestId")]
    pub pest_id: i64,
    #[serde(alias = "pestTitle")]
    pub pest_title: String,
    pub location: String,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[serde(alias = "observationDate")]
    pub observation_date: String,
    pub notes: Option<String>,
    #[serde(alias = "impactWhenua")]
    pub impact_whenua: Option<String>,
    #[serde(alias = "impactWai")]
    pub impact_wai: Option<String>,
    #[serde(alias = "impactTangata")]
    pub impact_tangata: Option<String>,
    /// Data URLs, one per photo.
    pub photos: Vec<String>,
    /// Single-photo field of earlier clients; folded into `photos`.
    #[serde(alias = "photoBase64")]
    pub photo_base64: Option<String>,
    #[serde(alias = "submitterName")]
    pub submitter_name: Option<String>,
    #[serde(alias = "submitterEmail")]
    pub submitter_email: Option<String>,
}

/// A payload that passed validation. Photos are decoded but not yet stored.
#[derive(Debug)]
pub struct CheckedObservation {
    pub submission: NewSubmission,
    pub photos: Vec<DecodedPhoto>,
}

impl ObservationPayload {
    pub fn check(self, limits: &SubmissionConfig) -> Result<CheckedObservation, ApiError> {
        if self.pest_id <= 0 {
            return Err(ApiError::Validation("pest_id must be a positive id".into()));
        }
        let pest_title = required(&self.pest_title, "pest_title")?;
        let location = required(&self.location, "location")?;
        let observation_date = parse_observation_date(&self.observation_date).ok_or_else(|| {
            ApiError::Validation(format!("observation_date '{}' is not a date", self.observation_date))
        })?;

        let submitter_email = blank_to_none(self.submitter_email);
        if let Some(email) = &submitter_email {
            if !EMAIL.is_match(email) {
                return Err(ApiError::Validation("submitter_email is not a valid email".into()));
            }
        }

        let raw_photos: Vec<String> = self
            .photos
            .into_iter()
            .chain(self.photo_base64)
            .filter(|p| !p.trim().is_empty())
            .collect();
        if raw_photos.len() > limits.max_photos {
            return Err(ApiError::Validation(format!(
                "at most {} photos per observation",
                limits.max_photos
            )));
        }

        let mut photos = Vec::with_capacity(raw_photos.len());
        for (index, raw) in raw_photos.iter().enumerate() {
            match decode_data_url(raw) {
                Ok(photo) if photo.bytes.len() > limits.max_photo_bytes => {
                    return Err(ApiError::Validation(format!(
                        "photo {} is {} bytes, limit is {}",
                        index + 1,
                        photo.bytes.len(),
                        limits.max_photo_bytes
                    )));
                }
                Ok(photo) => photos.push(photo),
                Err(e) => tracing::warn!(index, error = %e, "skipping unreadable photo"),
            }
        }

        Ok(CheckedObservation {
            submission: NewSubmission {
                pest_id: self.pest_id,
                pest_title,
                location,
                observation_date,
                notes: blank_to_none(self.notes),
                impact_whenua: parse_impact(self.impact_whenua, "impact_whenua")?,
                impact_wai: parse_impact(self.impact_wai, "impact_wai")?,
                impact_tangata: parse_impact(self.impact_tangata, "impact_tangata")?,
                photo_urls: Vec::new(),
                photo_keys: Vec::new(),
                submitter_name: blank_to_none(self.submitter_name),
                submitter_email,
                ip_address: None,
                user_agent: None,
            },
            photos,
        })
    }
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn parse_impact(raw: Option<String>, field: &str) -> Result<Option<Severity>, ApiError> {
    match blank_to_none(raw) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("{field} must be one of none, low, medium, high, severe"))),
    }
}

pub fn parse_observation_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhotoError {
    #[error("not a base64 data URL")]
    NotDataUrl,

    #[error("unsupported content type {0}")]
    UnsupportedType(String),

    #[error("invalid base64 payload")]
    InvalidBase64,

    #[error("empty photo")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPhoto {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DecodedPhoto {
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "img",
        }
    }
}

pub fn decode_data_url(raw: &str) -> Result<DecodedPhoto, PhotoError> {
    let caps = DATA_URL.captures(raw.trim()).ok_or(PhotoError::NotDataUrl)?;
    let mime = caps[1].trim().to_ascii_lowercase();
    if !mime.starts_with("image/") {
        return Err(PhotoError::UnsupportedType(mime));
    }
    let payload: String = caps[2].chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.as_bytes())
        .map_err(|_| PhotoError::InvalidBase64)?;
    if bytes.is_empty() {
        return Err(PhotoError::Empty);
    }
    Ok(DecodedPhoto { mime, bytes })
}

pub fn photo_key(photo: &DecodedPhoto) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "submissions/{}-{}.{}",
        Utc::now().timestamp_millis(),
        &suffix[..8],
        photo.extension()
    )
}

/// Upload every photo; failures are logged and skipped.
/// Returns the stored URLs and keys in upload order.
pub async fn store_photos(store: &dyn PhotoStore, photos: Vec<DecodedPhoto>) -> (Vec<String>, Vec<String>) {
    let mut urls = Vec::with_capacity(photos.len());
    let mut keys = Vec::with_capacity(photos.len());
    for photo in photos {
        let key = photo_key(&photo);
        match store.put(&key, photo.bytes, &photo.mime).await {
            Ok(stored) => {
                urls.push(stored.url);
                keys.push(stored.key);
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "photo upload failed, continuing without it"),
        }
    }
    (urls, keys)
}

// ---------------------------------------------------------------------------
// Client metadata
// ---------------------------------------------------------------------------

/// Request metadata stored alongside a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let forwarded = header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .filter(|v| !v.is_empty());
        let ip = forwarded
            .or_else(|| header("x-real-ip"))
            .or_else(|| peer.map(|p| p.ip().to_string()));
        Self { ip, user_agent: header("user-agent") }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientMeta::from_parts(&parts.headers, peer))
    }
}

// ---------------------------------------------------------------------------
// Accept
// ---------------------------------------------------------------------------

/// Validate, upload photos, then write the row.
pub async fn accept(
    db: &Database,
    photos: &dyn PhotoStore,
    limits: &SubmissionConfig,
    payload: ObservationPayload,
    client: ClientMeta,
) -> Result<Submission, ApiError> {
    let CheckedObservation { mut submission, photos: decoded } = payload.check(limits)?;
    if !db.is_configured() {
        // Don't upload photos for a row that cannot be written.
        return Err(mauri_db::DbError::NotConfigured.into());
    }

    let (urls, keys) = store_photos(photos, decoded).await;
    submission.photo_urls = urls;
    submission.photo_keys = keys;
    submission.ip_address = client.ip;
    submission.user_agent = client.user_agent;

    let stored = db.submissions().create(submission).await?;
    tracing::info!(
        id = stored.id,
        pest_id = stored.pest_id,
        photos = stored.photo_keys.len(),
        "observation submitted"
    );
    Ok(stored)
}
