//! Database handle: the three repositories behind one injected bundle.

use mauri_common::config::DatabaseConfig;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::memory::MemoryStore;
use crate::offline::OfflineStore;
use crate::pests::{PestRepository, PgPestRepository};
use crate::schema;
use crate::submissions::{PgSubmissionRepository, SubmissionRepository};
use crate::users::{PgUserRepository, UserRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Memory,
    Offline,
}

/// Main database handle. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pests: Arc<dyn PestRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    users: Arc<dyn UserRepository>,
    backend: Backend,
}

impl Database {
    pub fn new(
        pests: Arc<dyn PestRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        users: Arc<dyn UserRepository>,
        backend: Backend,
    ) -> Self {
        Self { pests, submissions, users, backend }
    }

    /// Connect according to config. Never fails: a missing URL or a failed
    /// connection leaves the site running on the offline store.
    pub async fn connect(config: &DatabaseConfig) -> Self {
        let Some(url) = config.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            tracing::warn!("no database URL configured, running offline");
            return Self::offline();
        };

        let pool = match Self::pool(url, config.max_connections).await {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!(error = %e, "database connection failed, running offline");
                return Self::offline();
            }
        };
        tracing::info!(max_connections = config.max_connections, "connected to PostgreSQL");

        if config.bootstrap_schema {
            if let Err(e) = Self::initialize(&pool).await {
                tracing::error!(error = %e, "schema bootstrap failed");
            }
        }
        Self::from_pool(pool)
    }

    /// Open a Postgres pool. Errors propagate.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let pool = Self::pool(url, max_connections).await?;
        tracing::info!(max_connections, "connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(
            Arc::new(PgPestRepository::new(pool.clone())),
            Arc::new(PgSubmissionRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool)),
            Backend::Postgres,
        )
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store.clone(), store, Backend::Memory)
    }

    pub fn offline() -> Self {
        let store = Arc::new(OfflineStore);
        Self::new(store.clone(), store.clone(), store, Backend::Offline)
    }

    /// Create tables if they don't exist.
    pub async fn initialize(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA_SQL).execute(pool).await?;
        tracing::debug!("schema bootstrap complete");
        Ok(())
    }

    pub async fn pool(url: &str, max_connections: u32) -> Result<PgPool> {
        Ok(PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?)
    }

    pub fn pests(&self) -> &dyn PestRepository {
        self.pests.as_ref()
    }

    pub fn submissions(&self) -> &dyn SubmissionRepository {
        self.submissions.as_ref()
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// False when running on the offline store.
    pub fn is_configured(&self) -> bool {
        self.backend != Backend::Offline
    }

    /// Counters for the admin dashboard.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            total_pests: self.pests.count().await?,
            alert_pests: self.pests.count_alerts().await?,
            total_submissions: self.submissions.count().await?,
        })
    }
}

/// Database statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub total_pests: i64,
    pub alert_pests: i64,
    pub total_submissions: i64,
}
