//! Pest catalog repository.
//!
//! Public reads only ever see `visible` rows; the admin console uses
//! `list_all`. Access control is the caller's job, not the store's.

use async_trait::async_trait;
use mauri_common::{NewPest, Pest, PestPatch};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::{DbError, Result};
use crate::schema::{escape_like, PestRow, PEST_COLUMNS};

#[async_trait]
pub trait PestRepository: Send + Sync {
    /// Visible pests, ordered by title.
    async fn list_visible(&self) -> Result<Vec<Pest>>;

    /// Every pest including hidden ones, ordered by title.
    async fn list_all(&self) -> Result<Vec<Pest>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Pest>>;

    /// Exact title match.
    async fn get_by_title(&self, title: &str) -> Result<Option<Pest>>;

    /// Visible pests whose title, latin name, keywords or aliases contain
    /// `query` case-insensitively. Blank input is the same as `list_visible`.
    async fn search(&self, query: &str) -> Result<Vec<Pest>>;

    /// Fails with `DbError::Duplicate` when the title is taken.
    async fn create(&self, pest: NewPest) -> Result<Pest>;

    /// Returns rows affected; 0 when the id does not exist.
    async fn update(&self, id: i64, patch: PestPatch) -> Result<u64>;

    /// Returns rows affected; deleting a missing id is not an error.
    async fn delete(&self, id: i64) -> Result<u64>;

    /// Number of visible pests.
    async fn count(&self) -> Result<i64>;

    /// Number of visible pests carrying an alert.
    async fn count_alerts(&self) -> Result<i64>;
}

/// PostgreSQL pest repository.
#[derive(Clone)]
pub struct PgPestRepository {
    pool: PgPool,
}

impl PgPestRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn fetch_many(&self, sql: &str) -> Result<Vec<Pest>> {
        let rows: Vec<PestRow> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Pest::from).collect())
    }
}

#[async_trait]
impl PestRepository for PgPestRepository {
    async fn list_visible(&self) -> Result<Vec<Pest>> {
        let sql = format!("SELECT {PEST_COLUMNS} FROM pests WHERE visible = TRUE ORDER BY title");
        self.fetch_many(&sql).await
    }

    async fn list_all(&self) -> Result<Vec<Pest>> {
        let sql = format!("SELECT {PEST_COLUMNS} FROM pests ORDER BY title");
        self.fetch_many(&sql).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Pest>> {
        let sql = format!("SELECT {PEST_COLUMNS} FROM pests WHERE id = $1");
        let row: Option<PestRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Pest::from))
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<Pest>> {
        let sql = format!("SELECT {PEST_COLUMNS} FROM pests WHERE title = $1");
        let row: Option<PestRow> = sqlx::query_as(&sql)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Pest::from))
    }

    async fn search(&self, query: &str) -> Result<Vec<Pest>> {
        if query.trim().is_empty() {
            return self.list_visible().await;
        }
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r#"SELECT {PEST_COLUMNS} FROM pests
               WHERE visible = TRUE
                 AND (title ILIKE $1 ESCAPE '\'
                      OR latin ILIKE $1 ESCAPE '\'
                      OR keywords ILIKE $1 ESCAPE '\'
                      OR also_known_as ILIKE $1 ESCAPE '\')
               ORDER BY title"#
        );
        let rows: Vec<PestRow> = sqlx::query_as(&sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(query = %query, hits = rows.len(), "pest search");
        Ok(rows.into_iter().map(Pest::from).collect())
    }

    async fn create(&self, pest: NewPest) -> Result<Pest> {
        let pest = pest.normalized()?;
        let sql = format!(
            "INSERT INTO pests (title, latin, also_known_as, keywords, pest_groups, pest_types, \
             management_approaches, alert, pinned, visible, featured_image, link) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12) \
             RETURNING {PEST_COLUMNS}"
        );
        let row: PestRow = sqlx::query_as(&sql)
            .bind(&pest.title)
            .bind(&pest.latin)
            .bind(&pest.also_known_as)
            .bind(&pest.keywords)
            .bind(pest.pest_groups.to_storage())
            .bind(pest.pest_types.to_storage())
            .bind(pest.management_approaches.to_storage())
            .bind(pest.alert)
            .bind(pest.pinned)
            .bind(pest.visible)
            .bind(&pest.featured_image)
            .bind(&pest.link)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, format!("pest title '{}'", pest.title)))?;
        tracing::debug!(id = row.id, title = %row.title, "pest created");
        Ok(row.into())
    }

    async fn update(&self, id: i64, patch: PestPatch) -> Result<u64> {
        patch.validate()?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE pests SET updated_at = now()");
        if let Some(title) = &patch.title {
            qb.push(", title = ").push_bind(title.trim().to_string());
        }
        push_text(&mut qb, "latin", &patch.latin);
        push_text(&mut qb, "also_known_as", &patch.also_known_as);
        push_text(&mut qb, "keywords", &patch.keywords);
        if let Some(v) = &patch.pest_groups {
            qb.push(", pest_groups = ").push_bind(v.to_storage());
        }
        if let Some(v) = &patch.pest_types {
            qb.push(", pest_types = ").push_bind(v.to_storage());
        }
        if let Some(v) = &patch.management_approaches {
            qb.push(", management_approaches = ").push_bind(v.to_storage());
        }
        if let Some(v) = patch.alert {
            qb.push(", alert = ").push_bind(v);
        }
        if let Some(v) = patch.pinned {
            qb.push(", pinned = ").push_bind(v);
        }
        if let Some(v) = patch.visible {
            qb.push(", visible = ").push_bind(v);
        }
        push_text(&mut qb, "featured_image", &patch.featured_image);
        push_text(&mut qb, "link", &patch.link);
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, format!("pest title for id {id}")))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pests WHERE visible = TRUE")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_alerts(&self) -> Result<i64> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pests WHERE visible = TRUE AND alert = TRUE")
                .fetch_one(&self.pool)
                .await?;
        Ok(n)
    }
}

/// Optional text column: an empty string clears it.
fn push_text(qb: &mut QueryBuilder<'_, Postgres>, column: &str, value: &Option<String>) {
    if let Some(v) = value {
        let v = mauri_common::catalog::blank_to_none(Some(v.clone()));
        qb.push(", ").push(column).push(" = ").push_bind(v);
    }
}
