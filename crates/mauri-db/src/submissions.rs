//! Community observation repository. Rows are written once and never
//! updated; only admins read or delete them.

use async_trait::async_trait;
use mauri_common::{NewSubmission, Severity, Submission};
use sqlx::PgPool;

use crate::error::Result;
use crate::schema::{join_list, SubmissionRow, SUBMISSION_COLUMNS};

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create(&self, submission: NewSubmission) -> Result<Submission>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<Submission>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Submission>>;

    /// Returns rows affected.
    async fn delete(&self, id: i64) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

#[derive(Clone)]
pub struct PgSubmissionRepository {
    pool: PgPool,
}

impl PgSubmissionRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn severity_text(s: Option<Severity>) -> Option<&'static str> {
    s.map(|s| s.as_str())
}

#[async_trait]
impl SubmissionRepository for PgSubmissionRepository {
    async fn create(&self, s: NewSubmission) -> Result<Submission> {
        let sql = format!(
            "INSERT INTO submissions (pest_id, pest_title, location, observation_date, notes, \
             impact_whenua, impact_wai, impact_tangata, photo_urls, photo_keys, \
             submitter_name, submitter_email, ip_address, user_agent) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14) \
             RETURNING {SUBMISSION_COLUMNS}"
        );
        let row: SubmissionRow = sqlx::query_as(&sql)
            .bind(s.pest_id)
            .bind(&s.pest_title)
            .bind(&s.location)
            .bind(s.observation_date)
            .bind(&s.notes)
            .bind(severity_text(s.impact_whenua))
            .bind(severity_text(s.impact_wai))
            .bind(severity_text(s.impact_tangata))
            .bind(join_list(&s.photo_urls))
            .bind(join_list(&s.photo_keys))
            .bind(&s.submitter_name)
            .bind(&s.submitter_email)
            .bind(&s.ip_address)
            .bind(&s.user_agent)
            .fetch_one(&self.pool)
            .await?;
        tracing::debug!(id = row.id, pest_id = row.pest_id, "submission stored");
        row.try_into()
    }

    async fn list(&self) -> Result<Vec<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY created_at DESC, id DESC");
        let rows: Vec<SubmissionRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Submission::try_from).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");
        let row: Option<SubmissionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Submission::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
