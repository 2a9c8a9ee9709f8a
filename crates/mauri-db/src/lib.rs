//! Mauri Database Layer
//!
//! Repositories for the `pests`, `submissions` and `users` tables behind
//! async traits, with three backends:
//!
//! - `Pg*Repository`: PostgreSQL via sqlx
//! - `MemoryStore`: in-process tables for tests and local development
//! - `OfflineStore`: used when no database is reachable
//!
//! # Example
//!
//! ```rust,no_run
//! use mauri_common::config::DatabaseConfig;
//! use mauri_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect(&DatabaseConfig::default()).await;
//!     let pests = db.pests().list_visible().await?;
//!     println!("{} pests", pests.len());
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod memory;
pub mod offline;
pub mod pests;
pub mod schema;
pub mod submissions;
pub mod users;

pub use database::{Backend, Database, DatabaseStats};
pub use error::{DbError, Result};
pub use memory::MemoryStore;
pub use offline::OfflineStore;
pub use pests::{PestRepository, PgPestRepository};
pub use schema::SCHEMA_SQL;
pub use submissions::{PgSubmissionRepository, SubmissionRepository};
pub use users::{PgUserRepository, UserRepository};
