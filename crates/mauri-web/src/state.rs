//! Shared application state for the web server.

use mauri_common::Config;
use mauri_db::Database;
use std::sync::Arc;

use crate::pages::Pages;
use crate::storage::{self, PhotoStore};

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub db: Database,
    pub photos: Arc<dyn PhotoStore>,
    pub pages: Pages,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Database, photos: Arc<dyn PhotoStore>, config: Config) -> anyhow::Result<Self> {
        let pages = Pages::new(&config.site)?;
        Ok(Self { db, photos, pages, config })
    }

    /// Connect the database and photo store as configured.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database).await;
        let photos = storage::from_config(&config.storage);
        Self::new(db, photos, config)
    }

    /// In-memory database; photos go wherever storage is configured.
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        let photos = storage::from_config(&config.storage);
        Self::new(Database::in_memory(), photos, config)
    }
}

pub type SharedState = Arc<AppState>;
