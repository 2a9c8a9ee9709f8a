//! Store used when no database is configured or the connection failed.
//! Reads come back empty so public pages still render; writes fail with
//! `DbError::NotConfigured`.

use async_trait::async_trait;
use mauri_common::{NewPest, NewSubmission, Pest, PestPatch, Submission, UpsertUser, User};

use crate::error::{DbError, Result};
use crate::pests::PestRepository;
use crate::submissions::SubmissionRepository;
use crate::users::UserRepository;

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineStore;

#[async_trait]
impl PestRepository for OfflineStore {
    async fn list_visible(&self) -> Result<Vec<Pest>> { Ok(Vec::new()) }
    async fn list_all(&self) -> Result<Vec<Pest>> { Ok(Vec::new()) }
    async fn get_by_id(&self, _id: i64) -> Result<Option<Pest>> { Ok(None) }
    async fn get_by_title(&self, _title: &str) -> Result<Option<Pest>> { Ok(None) }
    async fn search(&self, _query: &str) -> Result<Vec<Pest>> { Ok(Vec::new()) }

    async fn create(&self, pest: NewPest) -> Result<Pest> {
        tracing::warn!(title = %pest.title, "cannot create pest: database not available");
        Err(DbError::NotConfigured)
    }

    async fn update(&self, id: i64, _patch: PestPatch) -> Result<u64> {
        tracing::warn!(id, "cannot update pest: database not available");
        Err(DbError::NotConfigured)
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        tracing::warn!(id, "cannot delete pest: database not available");
        Err(DbError::NotConfigured)
    }

    async fn count(&self) -> Result<i64> { Ok(0) }
    async fn count_alerts(&self) -> Result<i64> { Ok(0) }
}

#[async_trait]
impl SubmissionRepository for OfflineStore {
    async fn create(&self, submission: NewSubmission) -> Result<Submission> {
        tracing::warn!(pest_id = submission.pest_id, "cannot store submission: database not available");
        Err(DbError::NotConfigured)
    }

    async fn list(&self) -> Result<Vec<Submission>> { Ok(Vec::new()) }
    async fn get_by_id(&self, _id: i64) -> Result<Option<Submission>> { Ok(None) }

    async fn delete(&self, id: i64) -> Result<u64> {
        tracing::warn!(id, "cannot delete submission: database not available");
        Err(DbError::NotConfigured)
    }

    async fn count(&self) -> Result<i64> { Ok(0) }
}

#[async_trait]
impl UserRepository for OfflineStore {
    async fn upsert(&self, user: UpsertUser) -> Result<User> {
        tracing::warn!(open_id = %user.open_id, "cannot upsert user: database not available");
        Err(DbError::NotConfigured)
    }

    async fn find_by_open_id(&self, _open_id: &str) -> Result<Option<User>> { Ok(None) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_empty_writes_fail() {
        let store = OfflineStore;
        assert!(store.list_visible().await.unwrap().is_empty());
        assert!(store.search("gorse").await.unwrap().is_empty());
        assert!(store.get_by_title("Gorse").await.unwrap().is_none());
        assert!(SubmissionRepository::list(&store).await.unwrap().is_empty());

        let err = PestRepository::create(&store, NewPest::new("Gorse")).await.unwrap_err();
        assert!(matches!(err, DbError::NotConfigured));
        assert!(matches!(PestRepository::delete(&store, 1).await, Err(DbError::NotConfigured)));
        assert!(matches!(store.upsert(UpsertUser::new("x")).await, Err(DbError::NotConfigured)));
    }
}
