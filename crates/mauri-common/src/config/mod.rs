//! Configuration loading for Mauri.
//! Reads mauri.toml from the current directory or the path in MAURI_CONFIG,
//! then applies environment overrides. A missing file means defaults: the
//! site still starts, with data operations degraded until a database is set.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{MauriError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub submissions: SubmissionConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind(), port: default_port() }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| MauriError::Config(format!("invalid bind address {}:{}: {e}", self.bind, self.port)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. Unset means offline mode.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Run the CREATE TABLE IF NOT EXISTS bootstrap on startup.
    #[serde(default = "bool_true")]
    pub bootstrap_schema: bool,
}

fn default_max_connections() -> u32 { 5 }
fn bool_true() -> bool { true }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: default_max_connections(), bootstrap_schema: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Open id that is granted the admin role on first sign-in.
    pub owner_open_id: Option<String>,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Header set by the fronting identity proxy.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

fn default_session_cookie() -> String { "mauri_session".to_string() }
fn default_identity_header() -> String { "x-forwarded-user".to_string() }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            owner_open_id: None,
            session_cookie: default_session_cookie(),
            identity_header: default_identity_header(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// Object store endpoint photos are PUT to.
    pub endpoint: Option<String>,
    /// Public base URL photos are served from; defaults to the endpoint.
    pub public_base_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub token: Option<SecretString>,
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,
    #[serde(default = "default_max_photo_bytes")]
    pub max_photo_bytes: usize,
}

fn default_max_photos() -> usize { 5 }
fn default_max_photo_bytes() -> usize { 10 * 1024 * 1024 }

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self { max_photos: default_max_photos(), max_photo_bytes: default_max_photo_bytes() }
    }
}

/// Room for the non-photo fields of an observation.
const BODY_SLACK: usize = 1024 * 1024;

impl SubmissionConfig {
    /// Request body cap that still admits `max_photos` photos of
    /// `max_photo_bytes` each. Base64 adds a third and form encoding
    /// escapes `+` and `/`, so allow half again.
    pub fn body_limit(&self) -> usize {
        let photos = self.max_photos.saturating_mul(self.max_photo_bytes);
        photos.saturating_add(photos / 2).saturating_add(BODY_SLACK)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Pest `link` values are paths on this site.
    #[serde(default = "default_external_link_base")]
    pub external_link_base: String,
}

fn default_site_name() -> String { "Mauri Pest Guide".to_string() }
fn default_external_link_base() -> String { "https://www.ecan.govt.nz".to_string() }

impl Default for SiteConfig {
    fn default() -> Self {
        Self { name: default_site_name(), external_link_base: default_external_link_base() }
    }
}


impl Config {
    /// Load configuration from mauri.toml.
    /// Checks MAURI_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("MAURI_CONFIG")
            .unwrap_or_else(|_| "mauri.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_path(&path)?
        } else {
            tracing::info!(path = %path, "config file not found, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment values win over the file. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(bind) = get("MAURI_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(port = %port, "ignoring unparsable PORT"),
            }
        }
        if let Some(owner) = get("MAURI_OWNER_OPEN_ID") {
            self.auth.owner_open_id = Some(owner);
        }
        if let Some(endpoint) = get("MAURI_STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(public) = get("MAURI_STORAGE_PUBLIC_URL") {
            self.storage.public_base_url = Some(public);
        }
        if let Some(token) = get("MAURI_STORAGE_TOKEN") {
            self.storage.token = Some(SecretString::from(token));
        }
    }
}
