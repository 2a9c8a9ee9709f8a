//! User repository: sign-in upsert keyed by the external open id.

use async_trait::async_trait;
use mauri_common::{UpsertUser, User};
use sqlx::PgPool;

use crate::error::{DbError, Result};
use crate::schema::{UserRow, USER_COLUMNS};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert when absent, else overwrite only the supplied fields.
    /// `last_signed_in` defaults to now.
    async fn upsert(&self, user: UpsertUser) -> Result<User>;

    async fn find_by_open_id(&self, open_id: &str) -> Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn upsert(&self, user: UpsertUser) -> Result<User> {
        if user.open_id.trim().is_empty() {
            return Err(DbError::Common(mauri_common::MauriError::validation(
                "open_id",
                "is required for upsert",
            )));
        }
        let sql = format!(
            r#"INSERT INTO users (open_id, name, email, login_method, role, last_signed_in)
               VALUES ($1, $2, $3, $4, COALESCE($5, 'user'), COALESCE($6, now()))
               ON CONFLICT (open_id) DO UPDATE SET
                   name           = COALESCE($2, users.name),
                   email          = COALESCE($3, users.email),
                   login_method   = COALESCE($4, users.login_method),
                   role           = COALESCE($5, users.role),
                   last_signed_in = COALESCE($6, now()),
                   updated_at     = now()
               RETURNING {USER_COLUMNS}"#
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(&user.open_id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.login_method)
            .bind(user.role.map(|r| r.as_str()))
            .bind(user.last_signed_in)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_open_id(&self, open_id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE open_id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(open_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }
}
