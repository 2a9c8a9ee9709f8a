//! Database error types.

use mauri_common::MauriError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database not configured")]
    NotConfigured,

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error(transparent)]
    Common(#[from] MauriError),
}

impl DbError {
    /// Map a unique-constraint violation to `Duplicate`, anything else to `Sqlx`.
    pub(crate) fn from_write(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Duplicate(what.into()),
            _ => DbError::Sqlx(err),
        }
    }
}
